extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, FnArg, ItemFn, PatType};

/// Runs the method body inside a transaction on its `session` argument.
///
/// The transaction is committed when the body returns `Ok` and aborted
/// otherwise. `session` must implement `model::session::Transaction`.
#[proc_macro_attribute]
pub fn tx(_args: TokenStream, input: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(input as ItemFn);
    let attrs = &input_fn.attrs;
    let vis = &input_fn.vis;
    let block = &input_fn.block;
    let fn_name = &input_fn.sig.ident;
    let fn_args = &input_fn.sig.inputs;
    let fn_return = &input_fn.sig.output;
    let generics = &input_fn.sig.generics;
    let where_clause = &input_fn.sig.generics.where_clause;
    let turbofish = generics.split_for_impl().1;
    let turbofish = turbofish.as_turbofish();

    let arg_list: Vec<_> = fn_args
        .iter()
        .map(|arg| match arg {
            FnArg::Typed(PatType { pat, .. }) => quote! { #pat },
            FnArg::Receiver(_) => quote!(self),
        })
        .collect();

    let wrapped_fn_name = quote::format_ident!("{}_inner", fn_name);
    let gen = quote! {
        #(#attrs)*
        async fn #wrapped_fn_name #generics (#fn_args) #fn_return #where_clause {
            #block
        }

        #(#attrs)*
        #vis async fn #fn_name #generics (#fn_args) #fn_return #where_clause {
            ::model::session::Transaction::begin(&mut *session).await?;
            match Self::#wrapped_fn_name #turbofish (#(#arg_list),*).await {
                Ok(result) => {
                    ::model::session::Transaction::commit(&mut *session).await?;
                    Ok(result)
                },
                Err(e) => {
                    ::model::session::Transaction::abort(&mut *session).await?;
                    Err(e)
                }
            }
        }
    };

    TokenStream::from(gen)
}
