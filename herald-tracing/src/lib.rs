#![warn(clippy::pedantic)]

extern crate proc_macro;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Expr, ItemFn, Lit, Meta, MetaNameValue, Stmt, Token, parse::Parser, parse_macro_input,
    parse_quote, punctuated::Punctuated,
};

/// Unit used when reporting how long the attributed function ran
#[derive(Clone, Copy)]
enum Precision {
    Millis,
    Seconds,
}

impl Precision {
    fn from_lit(lit: &syn::LitStr) -> syn::Result<Self> {
        match lit.value().as_str() {
            "ms" | "millis" | "milliseconds" => Ok(Self::Millis),
            "s" | "secs" | "seconds" => Ok(Self::Seconds),
            other => Err(syn::Error::new(
                lit.span(),
                format!("unknown precision `{other}`, expected \"ms\" or \"s\""),
            )),
        }
    }

    /// Statement logging the exit event with `self.timer`'s elapsed time
    fn exit_event(self, id: &str) -> Stmt {
        match self {
            Self::Millis => parse_quote! {
                tracing::trace!("OnExit: {} ({} ms elapsed)", #id, self.timer.elapsed().as_millis());
            },
            Self::Seconds => parse_quote! {
                tracing::trace!("OnExit: {} ({:.3} s elapsed)", #id, self.timer.elapsed().as_secs_f64());
            },
        }
    }
}

#[derive(Default)]
struct Attributes {
    timing: Option<Precision>,
    instrument: Option<TokenStream>,
}

impl Attributes {
    fn parse(args: TokenStream) -> syn::Result<Self> {
        let mut attributes = Self::default();
        let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;

        for meta in metas {
            if meta.path().is_ident("instrument") {
                attributes.instrument = Some(match meta {
                    Meta::List(list) => list.tokens,
                    _ => TokenStream::new(),
                });
            } else if meta.path().is_ident("timing") {
                attributes.timing = Some(Self::precision(&meta)?);
            } else {
                return Err(syn::Error::new_spanned(
                    meta.path(),
                    "expected `instrument(..)` or `timing(precision = \"..\")`",
                ));
            }
        }

        Ok(attributes)
    }

    /// `timing(precision = "ms")`, with seconds when no precision is given
    fn precision(meta: &Meta) -> syn::Result<Precision> {
        let Meta::List(list) = meta else {
            return Ok(Precision::Seconds);
        };

        let values =
            list.parse_args_with(Punctuated::<MetaNameValue, Token![,]>::parse_terminated)?;
        let Some(value) = values.first() else {
            return Ok(Precision::Seconds);
        };

        if value.path.is_ident("precision")
            && let Expr::Lit(expr) = &value.value
            && let Lit::Str(lit) = &expr.lit
        {
            return Precision::from_lit(lit);
        }

        Err(syn::Error::new_spanned(value, "expected `precision = \"..\"`"))
    }
}

/// Emits `OnEnter` / `OnExit` trace events around the attributed function.
///
/// * `instrument(..)` forwards its contents to `#[tracing::instrument(..)]`
/// * `timing(precision = "ms")` appends the elapsed time to the exit event
///
/// The exit event fires from a drop guard, so it is emitted on every return
/// path, including `?` and the end of an `async fn`'s future.
#[proc_macro_attribute]
pub fn traced(
    args: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let args = match Attributes::parse(args.into()) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error().into(),
    };

    let mut item_fn = parse_macro_input!(item as ItemFn);

    item_fn
        .attrs
        .push(parse_quote! { #[allow(clippy::items_after_statements)] });

    if let Some(fields) = &args.instrument {
        item_fn
            .attrs
            .push(parse_quote! { #[tracing::instrument(#fields)] });
    }

    let id = item_fn.sig.ident.to_string();
    let on_exit: Stmt = args.timing.map_or_else(
        || parse_quote! { tracing::trace!("OnExit: {}", #id); },
        |precision| precision.exit_event(&id),
    );

    let guard: Vec<Stmt> = parse_quote! {
        #[allow(dead_code)]
        struct __TracedGuard {
            timer: std::time::Instant,
        }

        impl std::ops::Drop for __TracedGuard {
            fn drop(&mut self) {
                #on_exit
            }
        }

        tracing::trace!("OnEnter: {}", #id);
        let __traced_guard = __TracedGuard {
            timer: std::time::Instant::now(),
        };
    };

    item_fn.block.stmts.splice(0..0, guard);

    proc_macro::TokenStream::from(quote! { #item_fn })
}
