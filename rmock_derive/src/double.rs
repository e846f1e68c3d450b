// vim: tw=80
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{
    Attribute,
    FnArg,
    GenericArgument,
    Ident,
    ItemTrait,
    Lifetime,
    Pat,
    PathArguments,
    ReturnType,
    Signature,
    TraitItem,
    TraitItemFn,
    Type,
    TypeParamBound,
    Visibility,
    ext::IdentExt,
    spanned::Spanned
};

/// Accumulate errors so the user sees all of them at once
fn push_error(errors: &mut Option<syn::Error>, e: syn::Error) {
    match errors {
        Some(prev) => prev.combine(e),
        None => *errors = Some(e)
    }
}

fn borrowed_lifetime(lt: &Lifetime) -> Option<Span> {
    (lt.ident != "static").then(|| lt.span())
}

/// Find a non-`'static` borrow in a return type.  Return values pass through
/// `rmock::Value`, which only holds `'static` data.
///
/// The parenthesized arguments of `Fn` sugar are skipped: their lifetimes are
/// higher-ranked, so `Box<dyn Fn(&str)>` is still `'static`.
fn find_borrow(ty: &Type) -> Option<Span> {
    match ty {
        Type::Reference(r) => match &r.lifetime {
            Some(lt) if lt.ident == "static" => find_borrow(&r.elem),
            _ => Some(r.span())
        },
        Type::Array(a) => find_borrow(&a.elem),
        Type::Group(g) => find_borrow(&g.elem),
        Type::Paren(p) => find_borrow(&p.elem),
        Type::Ptr(p) => find_borrow(&p.elem),
        Type::Slice(s) => find_borrow(&s.elem),
        Type::Tuple(t) => t.elems.iter().find_map(find_borrow),
        Type::Path(tp) => tp.qself.as_ref()
            .and_then(|q| find_borrow(&q.ty))
            .or_else(|| tp.path.segments.iter().find_map(|seg| {
                match &seg.arguments {
                    PathArguments::AngleBracketed(ab) => {
                        ab.args.iter().find_map(|arg| match arg {
                            GenericArgument::Type(ty) => find_borrow(ty),
                            GenericArgument::Lifetime(lt) =>
                                borrowed_lifetime(lt),
                            _ => None
                        })
                    },
                    _ => None
                }
            })),
        Type::TraitObject(to) => to.bounds.iter().find_map(|b| match b {
            TypeParamBound::Lifetime(lt) => borrowed_lifetime(lt),
            _ => None
        }),
        _ => None
    }
}

/// One argument of a doubled method
struct DoubledArg {
    ident: Ident,
    /// Reference arguments must be converted to owned values, because
    /// `rmock::Arg` only holds `'static` data.
    owned: bool,
}

struct DoubledMethod {
    /// Only `#[cfg]` attributes are propagated to generated items
    attrs: Vec<Attribute>,
    sig: Signature,
    /// Method name as seen by the mock, without any `r#` prefix
    name: String,
    args: Vec<DoubledArg>,
    /// Does the method take `self` by value?
    by_value: bool,
    output: Option<Type>,
}

impl DoubledMethod {
    fn new(tif: &TraitItemFn) -> syn::Result<Self> {
        let sig = &tif.sig;
        if let Some(a) = &sig.asyncness {
            return Err(syn::Error::new(a.span(),
                "#[double] does not support async methods"));
        }
        if let Some(c) = &sig.constness {
            return Err(syn::Error::new(c.span(),
                "#[double] does not support const methods"));
        }
        if sig.generics.type_params().next().is_some() ||
            sig.generics.const_params().next().is_some()
        {
            return Err(syn::Error::new(sig.generics.span(),
                "#[double] does not support generic methods"));
        }
        if let Some(v) = &sig.variadic {
            return Err(syn::Error::new(v.span(),
                "#[double] does not support variadic methods"));
        }
        let receiver = sig.receiver()
            .ok_or_else(|| syn::Error::new(sig.ident.span(),
                "methods without a receiver cannot be doubled"))?;
        if receiver.colon_token.is_some() {
            return Err(syn::Error::new(receiver.span(),
                "#[double] only supports self, &self, and &mut self receivers"));
        }

        let mut args = Vec::new();
        for fn_arg in sig.inputs.iter() {
            let pat_type = match fn_arg {
                FnArg::Receiver(_) => continue,
                FnArg::Typed(pat_type) => pat_type
            };
            let ident = match pat_type.pat.as_ref() {
                Pat::Ident(pi) if pi.by_ref.is_none() && pi.subpat.is_none() =>
                    pi.ident.clone(),
                p => return Err(syn::Error::new(p.span(),
                    "doubled methods must have named arguments"))
            };
            let owned = match pat_type.ty.as_ref() {
                Type::Reference(_) => true,
                Type::ImplTrait(it) => return Err(syn::Error::new(it.span(),
                    "#[double] does not support impl Trait arguments")),
                _ => false
            };
            args.push(DoubledArg { ident, owned });
        }

        let output = match &sig.output {
            ReturnType::Default => None,
            ReturnType::Type(_, ty) => match ty.as_ref() {
                Type::ImplTrait(it) => return Err(syn::Error::new(it.span(),
                    "#[double] does not support impl Trait return types")),
                ty => {
                    if let Some(span) = find_borrow(ty) {
                        return Err(syn::Error::new(span,
                            "#[double] does not support borrowed return types"));
                    }
                    Some(ty.clone())
                }
            }
        };

        let attrs = tif.attrs.iter()
            .filter(|attr| attr.path().is_ident("cfg"))
            .cloned()
            .collect();
        Ok(DoubledMethod {
            attrs,
            sig: sig.clone(),
            name: sig.ident.unraw().to_string(),
            args,
            by_value: receiver.reference.is_none(),
            output
        })
    }

    /// The method's implementation for `rmock::Double`
    fn gen_impl(&self) -> TokenStream {
        let attrs = &self.attrs;
        let sig = &self.sig;
        let name = &self.name;
        let this = if self.by_value { quote!(&self) } else { quote!(self) };
        let args = self.args.iter().map(|arg| {
            let ident = &arg.ident;
            if arg.owned {
                quote!(::rmock::Arg::new(::std::borrow::ToOwned::to_owned(&*#ident)))
            } else {
                quote!(::rmock::Arg::new(#ident))
            }
        });
        let call = quote!(
            ::rmock::Double::call(#this, #name,
                ::std::vec::Vec::<::rmock::Arg>::from([#(#args),*]))
        );
        let body = match &self.output {
            None => quote!(#call;),
            Some(ty) => quote!(#call.get::<#ty>())
        };
        quote!(
            #(#attrs)*
            #sig {
                #body
            }
        )
    }

    /// The method's signature in the `Calls` extension trait
    fn gen_calls_sig(&self) -> TokenStream {
        let attrs = &self.attrs;
        let ident = &self.sig.ident;
        let params = self.args.iter().map(|arg| {
            let ident = &arg.ident;
            quote!(#ident: ::rmock::Pattern)
        });
        quote!(
            #(#attrs)*
            fn #ident(&self, #(#params),*) -> ::rmock::Handle
        )
    }

    /// The method's implementation of the `Calls` trait for `rmock::Recorder`
    fn gen_calls_impl(&self) -> TokenStream {
        let sig = self.gen_calls_sig();
        let name = &self.name;
        let idents = self.args.iter().map(|arg| &arg.ident);
        quote!(
            #sig {
                ::rmock::recording::Record::record(self, #name,
                    ::std::vec::Vec::<::rmock::Pattern>::from([#(#idents),*]))
            }
        )
    }
}

pub(crate) struct DoubledTrait {
    ident: Ident,
    vis: Visibility,
    unsafety: Option<syn::token::Unsafe>,
    methods: Vec<DoubledMethod>,
}

impl DoubledTrait {
    pub(crate) fn new(item: &ItemTrait) -> syn::Result<Self> {
        if !item.generics.params.is_empty() {
            return Err(syn::Error::new(item.generics.span(),
                "#[double] does not support generic traits"));
        }
        let mut errors = None;
        let mut methods = Vec::new();
        for ti in item.items.iter() {
            match ti {
                TraitItem::Fn(tif) => match DoubledMethod::new(tif) {
                    Ok(m) => methods.push(m),
                    Err(e) => push_error(&mut errors, e)
                },
                _ => push_error(&mut errors, syn::Error::new(ti.span(),
                    "#[double] only supports traits whose items are all methods"))
            }
        }
        match errors {
            Some(e) => Err(e),
            None => Ok(DoubledTrait {
                ident: item.ident.clone(),
                vis: item.vis.clone(),
                unsafety: item.unsafety,
                methods
            })
        }
    }

    pub(crate) fn gen(&self) -> TokenStream {
        let ident = &self.ident;
        let vis = &self.vis;
        let unsafety = &self.unsafety;
        let calls = format_ident!("{}Calls", ident);
        let impls = self.methods.iter().map(DoubledMethod::gen_impl);
        let sigs = self.methods.iter().map(DoubledMethod::gen_calls_sig);
        let calls_impls = self.methods.iter().map(DoubledMethod::gen_calls_impl);
        quote!(
            #unsafety impl #ident for ::rmock::Double {
                #(#impls)*
            }
            #[allow(dead_code)]
            #vis trait #calls {
                #(#sigs;)*
            }
            impl #calls for ::rmock::Recorder<'_> {
                #(#calls_impls)*
            }
        )
    }
}

/// Test cases for `#[double]`.
#[cfg(test)]
mod t {

    use std::str::FromStr;
    use pretty_assertions::assert_eq;
    use proc_macro2::{Delimiter, TokenTree};
    use super::super::*;

    /// Render tokens one per word, ignoring `Spacing`, which differs between
    /// `quote!` and the lexer for sequences like `&*` and `<'_`.
    fn normalize(ts: TokenStream) -> String {
        ts.into_iter()
            .map(|tt| match tt {
                TokenTree::Group(g) => {
                    let (open, close) = match g.delimiter() {
                        Delimiter::Parenthesis => ("(", ")"),
                        Delimiter::Brace => ("{", "}"),
                        Delimiter::Bracket => ("[", "]"),
                        Delimiter::None => ("", "")
                    };
                    format!("{} {} {}", open, normalize(g.stream()), close)
                },
                other => other.to_string()
            }).collect::<Vec<_>>()
            .join(" ")
    }

    fn generate(attrs: &str, code: &str) -> TokenStream {
        let attrs = TokenStream::from_str(attrs).unwrap();
        let ts = TokenStream::from_str(code).unwrap();
        do_double(attrs, ts)
    }

    fn output(attrs: &str, code: &str) -> String {
        generate(attrs, code).to_string()
    }

    fn check(desired: &str, code: &str) {
        let output = normalize(generate("", code));
        let expected = normalize(TokenStream::from_str(desired).unwrap());
        assert_eq!(expected, output);
    }

    fn check_error(message: &str, code: &str) {
        let output = output("", code);
        assert!(output.contains("compile_error"), "{output}");
        assert!(output.contains(message), "{output}");
    }

    #[test]
    fn methods() {
        let code = r#"
        pub trait Foo {
            fn foo(&self, x: u32, y: &str) -> u32;
            fn bar(&mut self);
        }"#;
        let desired = r#"
        pub trait Foo {
            fn foo(&self, x: u32, y: &str) -> u32;
            fn bar(&mut self);
        }
        impl Foo for ::rmock::Double {
            fn foo(&self, x: u32, y: &str) -> u32 {
                ::rmock::Double::call(self, "foo",
                    ::std::vec::Vec::<::rmock::Arg>::from([
                        ::rmock::Arg::new(x),
                        ::rmock::Arg::new(::std::borrow::ToOwned::to_owned(&*y))
                    ])).get::<u32>()
            }
            fn bar(&mut self) {
                ::rmock::Double::call(self, "bar",
                    ::std::vec::Vec::<::rmock::Arg>::from([]));
            }
        }
        #[allow(dead_code)]
        pub trait FooCalls {
            fn foo(&self, x: ::rmock::Pattern, y: ::rmock::Pattern)
                -> ::rmock::Handle;
            fn bar(&self,) -> ::rmock::Handle;
        }
        impl FooCalls for ::rmock::Recorder<'_> {
            fn foo(&self, x: ::rmock::Pattern, y: ::rmock::Pattern)
                -> ::rmock::Handle
            {
                ::rmock::recording::Record::record(self, "foo",
                    ::std::vec::Vec::<::rmock::Pattern>::from([x, y]))
            }
            fn bar(&self,) -> ::rmock::Handle {
                ::rmock::recording::Record::record(self, "bar",
                    ::std::vec::Vec::<::rmock::Pattern>::from([]))
            }
        }"#;
        check(desired, code);
    }

    #[test]
    fn by_value_self() {
        let code = r#"
        trait Consume {
            fn finish(self) -> bool;
        }"#;
        let desired = r#"
        trait Consume {
            fn finish(self) -> bool;
        }
        impl Consume for ::rmock::Double {
            fn finish(self) -> bool {
                ::rmock::Double::call(&self, "finish",
                    ::std::vec::Vec::<::rmock::Arg>::from([])).get::<bool>()
            }
        }
        #[allow(dead_code)]
        trait ConsumeCalls {
            fn finish(&self,) -> ::rmock::Handle;
        }
        impl ConsumeCalls for ::rmock::Recorder<'_> {
            fn finish(&self,) -> ::rmock::Handle {
                ::rmock::recording::Record::record(self, "finish",
                    ::std::vec::Vec::<::rmock::Pattern>::from([]))
            }
        }"#;
        check(desired, code);
    }

    #[test]
    fn raw_identifier() {
        let out = output("", "trait T { fn r#type(&self); }");
        assert!(out.contains("\"type\""), "{out}");
        assert!(!out.contains("\"r#type\""), "{out}");
    }

    #[test]
    fn cfg_attrs_are_propagated() {
        let out = output("", r#"
        trait T {
            #[cfg(unix)]
            #[doc = "not propagated"]
            fn foo(&self);
        }"#);
        assert_eq!(4, out.matches("# [cfg (unix)]").count(), "{out}");
        assert_eq!(1, out.matches("not propagated").count(), "{out}");
    }

    #[test]
    fn unsafe_trait() {
        let out = output("", "unsafe trait T { fn foo(&self); }");
        assert!(out.contains("unsafe impl T for"), "{out}");
    }

    #[test]
    fn attribute_arguments() {
        let out = output("foo", "trait T { fn foo(&self); }");
        assert!(out.contains("#[double] takes no arguments"), "{out}");
    }

    #[test]
    fn not_a_trait() {
        let out = output("", "struct S;");
        assert!(out.contains("compile_error"), "{out}");
    }

    #[test]
    fn no_receiver() {
        check_error("methods without a receiver cannot be doubled",
                    "trait T { fn new() -> Self; }");
    }

    #[test]
    fn generic_method() {
        check_error("#[double] does not support generic methods",
                    "trait T { fn foo<X: 'static>(&self, x: X); }");
    }

    #[test]
    fn generic_trait() {
        check_error("#[double] does not support generic traits",
                    "trait T<X> { fn foo(&self, x: X); }");
    }

    #[test]
    fn async_method() {
        check_error("#[double] does not support async methods",
                    "trait T { async fn foo(&self); }");
    }

    #[test]
    fn impl_trait_argument() {
        check_error("#[double] does not support impl Trait arguments",
                    "trait T { fn foo(&self, x: impl Clone); }");
    }

    #[test]
    fn impl_trait_return() {
        check_error("#[double] does not support impl Trait return types",
                    "trait T { fn foo(&self) -> impl Clone; }");
    }

    #[test]
    fn borrowed_return() {
        check_error("#[double] does not support borrowed return types",
                    "trait T { fn foo(&self) -> &u32; }");
    }

    #[test]
    fn nested_borrowed_return() {
        check_error("#[double] does not support borrowed return types",
                    "trait T { fn foo(&self) -> Option<&str>; }");
    }

    #[test]
    fn lifetime_parameter_in_return() {
        check_error("#[double] does not support borrowed return types",
            "trait T { fn foo<'a>(&'a self, x: &'a str) -> Cow<'a, str>; }");
    }

    #[test]
    fn non_static_trait_object_return() {
        check_error("#[double] does not support borrowed return types",
            "trait T { fn foo<'a>(&'a self) -> Box<dyn Debug + 'a>; }");
    }

    #[test]
    fn static_returns_are_accepted() {
        for ret in ["&'static str", "Option<&'static [u8]>",
                    "Box<dyn Fn(&str) -> bool + Send>",
                    "Cow<'static, str>", "Box<dyn Debug + 'static>"]
        {
            let code = format!("trait T {{ fn foo(&self) -> {ret}; }}");
            let out = output("", &code);
            assert!(!out.contains("compile_error"), "{out}");
        }
    }

    /// Lifetimes that only appear in arguments are fine
    #[test]
    fn lifetime_parameter_in_arguments() {
        let out = output("", "trait T { fn foo<'a>(&self, x: &'a str); }");
        assert!(!out.contains("compile_error"), "{out}");
    }

    #[test]
    fn unnamed_argument() {
        check_error("doubled methods must have named arguments",
                    "trait T { fn foo(&self, _: u32); }");
    }

    #[test]
    fn associated_type() {
        check_error("#[double] only supports traits whose items are all methods",
                    "trait T { type X; fn foo(&self); }");
    }

    #[test]
    fn all_errors_are_reported() {
        let out = output("", "trait T { fn a(); fn b(); }");
        assert_eq!(2, out.matches("methods without a receiver").count(),
                   "{out}");
    }
}
