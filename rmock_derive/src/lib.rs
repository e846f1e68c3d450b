// vim: tw=80
//! Proc Macros for use with rmock
//!
//! You probably don't want to use this crate directly.  Instead, you use its
//! reexports via the [`rmock`](../rmock/index.html) crate.

extern crate proc_macro;

use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;

mod double;

fn do_double(attrs: TokenStream, input: TokenStream) -> TokenStream {
    if !attrs.is_empty() {
        return syn::Error::new(attrs.span(), "#[double] takes no arguments")
            .to_compile_error();
    }
    let item: syn::ItemTrait = match syn::parse2(input) {
        Ok(item) => item,
        Err(e) => return e.to_compile_error()
    };
    let generated = match double::DoubledTrait::new(&item) {
        Ok(dt) => dt.gen(),
        Err(e) => e.to_compile_error()
    };
    quote!(#item #generated)
}

/// Implement a trait for `rmock::Double`, and generate an extension trait
/// for recording calls to it.
///
/// For a trait `Foo`, this generates:
/// * `impl Foo for ::rmock::Double`, forwarding every method by name to
///   `Double::call`.  Reference arguments are converted with `ToOwned`.
/// * `trait FooCalls`, with one method per method of `Foo` taking one
///   `rmock::Pattern` per argument and returning an `rmock::Handle`,
///   implemented for `rmock::Recorder`.
///
/// # Examples
/// ```ignore
/// # use rmock::*;
/// #[double]
/// trait Store {
///     fn get(&self, key: u32) -> Option<String>;
///     fn put(&mut self, key: u32, value: &str);
/// }
///
/// let mock = Mock::new();
/// mock.stub().get(eq(1u32)).return_const(Some(String::from("one")));
/// mock.expect().put(eq(2u32), eq(String::from("two")));
///
/// let mut double = mock.double();
/// assert_eq!(Some(String::from("one")), double.get(1));
/// double.put(2, "two");
/// mock.verify().unwrap();
/// ```
#[proc_macro_attribute]
pub fn double(attrs: proc_macro::TokenStream, input: proc_macro::TokenStream)
    -> proc_macro::TokenStream
{
    do_double(attrs.into(), input.into()).into()
}
