// vim: tw=80
use super::*;

use quote::quote;
use syn::{
    FnArg,
    Ident,
    ItemTrait,
    Pat,
    ReturnType,
    Signature,
    TraitItem,
    Type,
    spanned::Spanned,
};

/// A trait method that can be adapted
struct Method<'a> {
    sig: &'a Signature,
    /// Argument names, in order, without the receiver
    args: Vec<&'a Ident>,
}

impl<'a> Method<'a> {
    fn name(&self) -> String {
        self.sig.ident.to_string()
    }

    /// Expression building the argument list sent to the double
    fn arg_values(&self) -> TokenStream {
        let args = &self.args;
        quote!(vec![#(::flexdouble::ToValue::to_value(&#args)),*])
    }
}

fn returns_self(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => match ty.as_ref() {
            Type::Path(tp) => tp.qself.is_none() && tp.path.is_ident("Self"),
            _ => false,
        }
    }
}

/// Check that a method can be adapted, and find its argument names.
fn method(sig: &Signature) -> Option<Method<'_>> {
    if !sig.generics.params.is_empty() {
        compile_error(sig.generics.span(),
            "automock does not support generic methods");
        return None;
    }
    if sig.asyncness.is_some() {
        compile_error(sig.span(), "automock does not support async methods");
        return None;
    }
    if returns_self(&sig.output) {
        compile_error(sig.output.span(),
            "automock does not support methods returning Self");
        return None;
    }
    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(r))
            if r.reference.is_some() && r.mutability.is_none() => (),
        _ => {
            compile_error(sig.span(), "automock methods must take &self");
            return None;
        }
    }
    let mut args = Vec::new();
    for input in inputs {
        let FnArg::Typed(pt) = input else {
            compile_error(input.span(), "Unexpected receiver");
            return None;
        };
        let Pat::Ident(pi) = pt.pat.as_ref() else {
            compile_error(pt.pat.span(),
                "automock requires plain identifiers as argument patterns");
            return None;
        };
        args.push(&pi.ident);
    }
    Some(Method { sig, args })
}

/// Check that a trait can be adapted, and collect its methods.
fn methods(item: &ItemTrait) -> Option<Vec<Method<'_>>> {
    if !item.generics.params.is_empty() {
        compile_error(item.generics.span(),
            "automock does not support generic traits");
        return None;
    }
    if !item.supertraits.is_empty() {
        compile_error(item.supertraits.span(),
            "automock does not support supertraits");
        return None;
    }
    let mut methods = Vec::new();
    for ti in &item.items {
        match ti {
            TraitItem::Fn(f) => methods.push(method(&f.sig)?),
            _ => {
                compile_error(ti.span(),
                    "automock only supports methods in traits");
                return None;
            }
        }
    }
    Some(methods)
}

/// `impl Shaped for dyn Trait`
fn gen_shape(ident: &Ident, methods: &[Method]) -> TokenStream {
    let trait_name = ident.to_string();
    let names = methods.iter().map(Method::name);
    let n = methods.len();
    quote!(
        impl ::flexdouble::Shaped for dyn #ident {
            fn shape() -> ::flexdouble::Shape {
                let methods: [&'static str; #n] = [#(#names),*];
                ::flexdouble::Shape::new(#trait_name, methods)
            }
        }
    )
}

/// `impl Trait for Double`
fn gen_double_impl(ident: &Ident, methods: &[Method]) -> TokenStream {
    let fns = methods.iter().map(|m| {
        let sig = m.sig;
        let name = m.name();
        let arg_values = m.arg_values();
        quote!(
            #sig {
                ::flexdouble::__private::reply(#name,
                    ::flexdouble::Double::invoke(self, #name, #arg_values,
                                                 false))
            }
        )
    });
    quote!(
        impl #ident for ::flexdouble::Double {
            #(#fns)*
        }
    )
}

/// The partial-double decorator, `TraitProxy<T>`
fn gen_proxy(item: &ItemTrait, methods: &[Method]) -> TokenStream {
    let ident = &item.ident;
    let vis = &item.vis;
    let proxy = gen_proxy_ident(ident);
    let trait_name = ident.to_string();
    let docstr = format!(
        "Partial double over a real [`{trait_name}`], generated by `#[automock]`");
    let fns = methods.iter().map(|m| {
        let sig = m.sig;
        let fn_ident = &sig.ident;
        let name = m.name();
        let args = &m.args;
        let arg_values = m.arg_values();
        quote!(
            #sig {
                if let Some(r) = ::flexdouble::__private::dispatch(&self.double,
                    #name, #arg_values)
                {
                    return r;
                }
                <T as #ident>::#fn_ident(&self.real, #(#args),*)
            }
        )
    });
    quote!(
        #[doc = #docstr]
        #vis struct #proxy<T: #ident> {
            real: T,
            double: ::flexdouble::Double,
        }

        impl<T: #ident> #proxy<T> {
            /// Wrap a real value.  Its double is shaped like the trait.
            #vis fn new(real: T) -> Self {
                #proxy {
                    real,
                    double: ::flexdouble::Double::based_on_type::<dyn #ident>(
                        #trait_name),
                }
            }

            /// The double that intercepted methods are routed to
            #vis fn double(&self) -> &::flexdouble::Double {
                &self.double
            }

            /// Tear the double down and return the real value.
            #vis fn into_inner(self) -> T {
                self.double.teardown();
                self.real
            }
        }

        impl<T: #ident> #ident for #proxy<T> {
            #(#fns)*
        }
    )
}

pub(crate) fn do_automock(attrs: TokenStream, input: TokenStream)
    -> TokenStream
{
    if !attrs.is_empty() {
        compile_error(attrs.span(), "automock does not take arguments");
        return TokenStream::new();
    }
    let item: syn::Item = match syn::parse2(input) {
        Ok(item) => item,
        Err(e) => return e.to_compile_error(),
    };
    let item_trait = match item {
        syn::Item::Trait(item_trait) => item_trait,
        other => {
            compile_error(other.span(), "automock can only be applied to traits");
            return TokenStream::new();
        }
    };
    let Some(methods) = methods(&item_trait) else {
        return TokenStream::new();
    };
    let mut output = gen_shape(&item_trait.ident, &methods);
    output.extend(gen_double_impl(&item_trait.ident, &methods));
    output.extend(gen_proxy(&item_trait, &methods));
    output
}
