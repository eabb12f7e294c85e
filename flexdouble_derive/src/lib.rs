// vim: tw=80
//! Proc Macros for use with Flexdouble
//!
//! You probably don't want to use this crate directly.  Instead, you use its
//! reexports via the [`flexdouble`](../flexdouble/index.html) crate.

#![cfg_attr(feature = "nightly", feature(proc_macro_diagnostic))]
extern crate proc_macro;

use cfg_if::cfg_if;
use proc_macro2::{Span, TokenStream};

mod automock;
use crate::automock::do_automock;

cfg_if! {
    // proc-macro2's Span::unstable method requires the nightly feature, and it
    // doesn't work in test mode.
    // https://github.com/alexcrichton/proc-macro2/issues/159
    if #[cfg(all(feature = "nightly", not(test)))] {
        fn compile_error(span: Span, msg: &str) {
            span.unstable()
                .error(msg)
                .emit();
        }
    } else {
        fn compile_error(_span: Span, msg: &str) {
            panic!("{msg}.  More information may be available when flexdouble is built with the \"nightly\" feature.");
        }
    }
}

/// Generate a proxy identifier from a trait's: eg "Foo" => "FooProxy"
fn gen_proxy_ident(ident: &syn::Ident) -> syn::Ident {
    syn::Ident::new(&format!("{ident}Proxy"), ident.span())
}

/// Automatically generate typed adapters between a trait and
/// [`flexdouble::Double`](../flexdouble/struct.Double.html).
///
/// For a trait `Foo` it generates:
/// * `impl Shaped for dyn Foo`, so that
///   `Double::based_on_type::<dyn Foo>(name)` creates a double shaped like
///   the trait.
/// * `impl Foo for Double`: each method sends its arguments to the double and
///   converts the reply back.  Routing errors and unconvertible replies panic.
/// * `FooProxy<T: Foo>`: a partial double.  Methods with declared
///   expectations are answered by the proxy's double; all others, and
///   expectations declared with `pass_thru`, reach the wrapped `T`.
///
/// The trait may have neither generic parameters nor supertraits, and its
/// items must be methods taking `&self`, whose arguments implement `ToValue`
/// and whose return types implement `FromValue`.
///
/// # Examples
/// ```ignore
/// use flexdouble::*;
/// #[automock]
/// pub trait Store {
///     fn get(&self, key: &str) -> Option<String>;
///     fn put(&self, key: &str, value: String);
/// }
/// ```
#[proc_macro_attribute]
pub fn automock(attrs: proc_macro::TokenStream, input: proc_macro::TokenStream)
    -> proc_macro::TokenStream
{
    let input: TokenStream = input.into();
    let mut output = input.clone();
    output.extend(do_automock(attrs.into(), input));
    output.into()
}
