//! # Tether Derive Macros
//!
//! Procedural macros for declaring listener capabilities.
//!
//! - `#[listener]` - Turn a listener trait into a notification enum plus a
//!   posting proxy
//!
//! Generated code refers to the runtime crate as `::tether`.

use proc_macro::TokenStream;
use syn::{ItemTrait, Meta, Token, parse_macro_input, punctuated::Punctuated};

mod listener_attr;
mod utils;

/// Attribute macro for listener traits.
///
/// Applied to a trait extending `tether::Listener`, it keeps the trait as
/// written and generates, next to it:
///
/// - `<Trait>Message` - one variant per operation carrying its arguments,
///   implementing `tether::Notification` with `Target = dyn <Trait>`
/// - `<Trait>Proxy` - implements the trait itself by posting a message to a
///   `tether::Connector`, so a worker calls listener operations as if the
///   listener were local
///
/// Operations take `&self` and owned arguments, and return `()` or
/// `Result<(), E>`. The generated names can be overridden with
/// `#[listener(message = Name, proxy = Name)]`.
///
/// # Example
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// #[tether::listener]
/// pub trait ProgressView: tether::Listener {
///     fn publish_progress(&self, percent: u32);
///     fn publish_result(&self, elapsed: Duration);
/// }
///
/// // Worker side
/// let view = ProgressViewProxy::new(ctx.connector().clone());
/// view.publish_progress(40);
/// ```
#[proc_macro_attribute]
pub fn listener(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args with Punctuated::<Meta, Token![,]>::parse_terminated);
    let input = parse_macro_input!(input as ItemTrait);
    listener_attr::listener_impl(args, input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
