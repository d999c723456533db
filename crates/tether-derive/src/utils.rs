//! Utility functions for macro implementations

use syn::{FnArg, Ident, Pat, PatType, Result, ReturnType, TraitItemFn, Type};

/// One accepted argument of a listener operation.
pub struct OperationArg {
    pub name: Ident,
    pub ty: Type,
}

/// Convert snake_case to PascalCase
pub fn to_pascal_case(s: &str) -> String {
    s.trim_start_matches("r#")
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

/// Check that `method` is a deliverable operation and collect its arguments.
///
/// Requires a `&self` receiver, no generics, no `async`, and owned
/// arguments bound to plain identifiers.
pub fn operation_args(method: &TraitItemFn) -> Result<Vec<OperationArg>> {
    let sig = &method.sig;

    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            sig.asyncness,
            "listener operations run on the dispatch thread and cannot be async",
        ));
    }
    if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "listener operations cannot be generic",
        ));
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                &sig.ident,
                "listener operations must take `&self`",
            ));
        }
    }

    inputs
        .map(|input| match input {
            FnArg::Typed(PatType { pat, ty, .. }) => {
                let Pat::Ident(pat_ident) = pat.as_ref() else {
                    return Err(syn::Error::new_spanned(
                        pat,
                        "listener operation arguments must be plain identifiers",
                    ));
                };
                if contains_reference(ty) {
                    return Err(syn::Error::new_spanned(
                        ty,
                        "listener operation arguments must be owned; they are carried to another thread",
                    ));
                }
                Ok(OperationArg {
                    name: pat_ident.ident.clone(),
                    ty: (**ty).clone(),
                })
            }
            FnArg::Receiver(receiver) => Err(syn::Error::new_spanned(
                receiver,
                "unexpected receiver",
            )),
        })
        .collect()
}

/// Check that the return type is `()` or `Result<(), E>`.
pub fn check_return_type(output: &ReturnType) -> Result<()> {
    let ReturnType::Type(_, ty) = output else {
        return Ok(());
    };
    if is_unit(ty) || is_unit_result(ty) {
        return Ok(());
    }
    Err(syn::Error::new_spanned(
        ty,
        "listener operations must return `()` or `Result<(), E>`",
    ))
}

fn is_unit(ty: &Type) -> bool {
    matches!(ty, Type::Tuple(tuple) if tuple.elems.is_empty())
}

fn is_unit_result(ty: &Type) -> bool {
    let Type::Path(type_path) = ty else {
        return false;
    };
    let Some(last) = type_path.path.segments.last() else {
        return false;
    };
    if last.ident != "Result" {
        return false;
    }
    match &last.arguments {
        syn::PathArguments::AngleBracketed(args) => matches!(
            args.args.first(),
            Some(syn::GenericArgument::Type(ok)) if is_unit(ok)
        ),
        _ => false,
    }
}

fn contains_reference(ty: &Type) -> bool {
    match ty {
        Type::Reference(_) => true,
        Type::Paren(inner) => contains_reference(&inner.elem),
        Type::Group(inner) => contains_reference(&inner.elem),
        Type::Tuple(tuple) => tuple.elems.iter().any(contains_reference),
        Type::Array(array) => contains_reference(&array.elem),
        Type::Slice(_) => true,
        Type::Path(type_path) => type_path.path.segments.iter().any(|segment| {
            match &segment.arguments {
                syn::PathArguments::AngleBracketed(args) => args.args.iter().any(|arg| match arg {
                    syn::GenericArgument::Type(inner) => contains_reference(inner),
                    syn::GenericArgument::Lifetime(_) => true,
                    _ => false,
                }),
                _ => false,
            }
        }),
        _ => false,
    }
}
