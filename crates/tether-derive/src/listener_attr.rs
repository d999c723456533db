//! Implementation of #[listener] attribute macro

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Expr, Ident, ItemTrait, Meta, Result, Token, TraitItem, punctuated::Punctuated};

use crate::utils::{OperationArg, check_return_type, operation_args, to_pascal_case};

struct Operation {
    method: Ident,
    variant: Ident,
    tag: String,
    args: Vec<OperationArg>,
    output: syn::ReturnType,
}

pub fn listener_impl(args: Punctuated<Meta, Token![,]>, input: ItemTrait) -> Result<TokenStream> {
    let trait_name = &input.ident;
    let mut message_name = format_ident!("{}Message", trait_name);
    let mut proxy_name = format_ident!("{}Proxy", trait_name);

    for arg in args {
        match arg {
            Meta::NameValue(nv) if nv.path.is_ident("message") => {
                message_name = ident_value(&nv.value)?;
            }
            Meta::NameValue(nv) if nv.path.is_ident("proxy") => {
                proxy_name = ident_value(&nv.value)?;
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "expected `message = Name` or `proxy = Name`",
                ));
            }
        }
    }

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[listener] traits cannot be generic",
        ));
    }

    let mut operations = Vec::new();
    for item in &input.items {
        match item {
            TraitItem::Fn(method) => {
                check_return_type(&method.sig.output)?;
                let name = &method.sig.ident;
                let tag = name.to_string().trim_start_matches("r#").to_string();
                operations.push(Operation {
                    method: name.clone(),
                    variant: format_ident!("{}", to_pascal_case(&tag)),
                    tag,
                    args: operation_args(method)?,
                    output: method.sig.output.clone(),
                });
            }
            TraitItem::Type(ty) => {
                return Err(syn::Error::new_spanned(
                    ty,
                    "#[listener] traits cannot have associated types",
                ));
            }
            _ => {}
        }
    }

    if operations.is_empty() {
        return Err(syn::Error::new_spanned(
            trait_name,
            "#[listener] traits need at least one operation",
        ));
    }

    let vis = &input.vis;

    let variants = operations.iter().map(|op| {
        let variant = &op.variant;
        let fields = op.args.iter().map(|arg| {
            let (name, ty) = (&arg.name, &arg.ty);
            quote! { #name: #ty }
        });
        quote! { #variant { #(#fields),* } }
    });

    let tag_arms = operations.iter().map(|op| {
        let (variant, tag) = (&op.variant, &op.tag);
        quote! { #message_name::#variant { .. } => #tag }
    });

    let dispatch_arms = operations.iter().map(|op| {
        let (variant, method, tag) = (&op.variant, &op.method, &op.tag);
        let names: Vec<_> = op.args.iter().map(|arg| &arg.name).collect();
        quote! {
            #message_name::#variant { #(#names),* } => {
                ::tether::listener::delivered(#tag, listener.#method(#(#names),*))
            }
        }
    });

    let proxy_methods = operations.iter().map(|op| {
        let (variant, method, output) = (&op.variant, &op.method, &op.output);
        let params = op.args.iter().map(|arg| {
            let (name, ty) = (&arg.name, &arg.ty);
            quote! { #name: #ty }
        });
        let names: Vec<_> = op.args.iter().map(|arg| &arg.name).collect();
        let returned = match output {
            syn::ReturnType::Default => quote! { () },
            syn::ReturnType::Type(_, ty) => quote! { #ty },
        };
        quote! {
            fn #method(&self, #(#params),*) #output {
                self.connector.post(#message_name::#variant { #(#names),* });
                <#returned as ::tether::listener::ProxyReturn>::posted()
            }
        }
    });

    let message_doc = format!(" One variant per operation of [`{trait_name}`].");
    let proxy_doc = format!(
        " Implements [`{trait_name}`] by posting each call through a connector."
    );

    let expanded = quote! {
        #input

        #[doc = #message_doc]
        #[allow(clippy::enum_variant_names)]
        #vis enum #message_name {
            #(#variants),*
        }

        impl ::tether::Notification for #message_name {
            type Target = dyn #trait_name;

            fn tag(&self) -> &'static str {
                match self {
                    #(#tag_arms),*
                }
            }

            fn dispatch(
                self,
                listener: &(dyn #trait_name),
            ) -> ::std::result::Result<(), ::tether::ListenerError> {
                match self {
                    #(#dispatch_arms)*
                }
            }
        }

        #[doc = #proxy_doc]
        #[derive(Clone)]
        #vis struct #proxy_name {
            connector: ::tether::Connector<#message_name>,
        }

        impl #proxy_name {
            pub fn new(connector: ::tether::Connector<#message_name>) -> Self {
                Self { connector }
            }

            pub fn connector(&self) -> &::tether::Connector<#message_name> {
                &self.connector
            }
        }

        impl ::tether::Listener for #proxy_name {}

        impl #trait_name for #proxy_name {
            #(#proxy_methods)*
        }
    };

    Ok(expanded)
}

fn ident_value(value: &Expr) -> Result<Ident> {
    match value {
        Expr::Path(path) => path
            .path
            .get_ident()
            .cloned()
            .ok_or_else(|| syn::Error::new_spanned(path, "expected an identifier")),
        other => Err(syn::Error::new_spanned(other, "expected an identifier")),
    }
}
