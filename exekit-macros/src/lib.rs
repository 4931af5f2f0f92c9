//! Procedural macros for exekit
//!
//! This crate provides the `#[exekit::test]` attribute macro for writing
//! tests against a deterministic `TestExecutor`.
//!
//! # Example
//!
//! ```rust,ignore
//! use exekit::prelude::*;
//!
//! #[exekit::test]
//! async fn my_test(executor: TestExecutor) {
//!     executor.delay(Duration::from_secs(10)).await;
//!     assert_eq!(executor.now().as_duration(), Duration::from_secs(10));
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, FnArg, Ident, ItemFn, Lit, Pat, Token, Type,
};

/// Configuration options for the test macro.
#[derive(Default)]
struct TestConfig {
    /// Initial virtual time, in seconds
    start_time_secs: Option<u64>,
    /// Label carried by the executor's log events
    name: Option<String>,
}

impl Parse for TestConfig {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut config = TestConfig::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let lit: Lit = input.parse()?;

            match (ident.to_string().as_str(), lit) {
                ("start_time", Lit::Int(i)) => {
                    config.start_time_secs = Some(i.base10_parse()?);
                }
                ("name", Lit::Str(s)) => {
                    config.name = Some(s.value());
                }
                ("start_time" | "name", lit) => {
                    return Err(syn::Error::new_spanned(
                        lit,
                        format!("unexpected value for `{ident}`"),
                    ));
                }
                _ => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {ident}"),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(config)
    }
}

/// Determines if a function parameter is requesting a TestExecutor.
fn is_executor_param(arg: &FnArg) -> bool {
    if let FnArg::Typed(pat_type) = arg {
        if let Type::Path(type_path) = &*pat_type.ty {
            if let Some(segment) = type_path.path.segments.last() {
                return segment.ident == "TestExecutor";
            }
        }
    }
    false
}

/// Extracts the parameter pattern from a function argument.
fn get_param_pat(arg: &FnArg) -> Option<&Pat> {
    if let FnArg::Typed(pat_type) = arg {
        Some(&pat_type.pat)
    } else {
        None
    }
}

/// Test attribute macro that runs a test against a deterministic executor.
///
/// # Basic Usage
///
/// Add an `executor: TestExecutor` parameter to receive a fresh executor.
/// Synchronous tests drive it by hand:
///
/// ```rust,ignore
/// use exekit::prelude::*;
/// use std::time::Duration;
///
/// #[exekit::test]
/// fn test_timer(executor: TestExecutor) {
///     let timer = executor.schedule_fn(Duration::from_secs(5), || {});
///     executor.advance_time(Duration::from_secs(5));
///     assert_eq!(executor.num_pending_timers(), 0);
/// }
/// ```
///
/// # Async Tests
///
/// An `async fn` body is spawned onto the executor and driven with
/// `TestExecutor::block_on`, so virtual time jumps straight to the next timer
/// whenever the body is waiting. The test fails if the body can never finish.
///
/// ```rust,ignore
/// #[exekit::test]
/// async fn test_delay(executor: TestExecutor) {
///     executor.delay(Duration::from_secs(60)).await;
///     assert_eq!(executor.now().as_duration(), Duration::from_secs(60));
/// }
/// ```
///
/// # Configuration Options
///
/// - `start_time = 100` - Start time in seconds (default: 0)
/// - `name = "fetcher"` - Executor name shown in log events and `Debug` output
///
/// ```rust,ignore
/// #[exekit::test(start_time = 1000, name = "fetcher")]
/// fn test_start_time(executor: TestExecutor) {
///     assert_eq!(executor.now().as_duration(), Duration::from_secs(1000));
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = parse_macro_input!(attr as TestConfig);
    let input = parse_macro_input!(item as ItemFn);

    expand_test(&config, &input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_test(config: &TestConfig, input: &ItemFn) -> syn::Result<TokenStream2> {
    let name = &input.sig.ident;
    let body = &input.block;
    let attrs = &input.attrs;
    let vis = &input.vis;
    let output = &input.sig.output;

    for arg in &input.sig.inputs {
        if !is_executor_param(arg) {
            return Err(syn::Error::new_spanned(
                arg,
                "only a `TestExecutor` parameter can be injected",
            ));
        }
    }
    if input.sig.inputs.len() > 1 {
        return Err(syn::Error::new_spanned(
            &input.sig.inputs,
            "at most one `TestExecutor` parameter is allowed",
        ));
    }

    let bind_param = input
        .sig
        .inputs
        .first()
        .and_then(get_param_pat)
        .map(|pat| quote! { let #pat = ::core::clone::Clone::clone(&__exekit_executor); });

    let start_time = config.start_time_secs.unwrap_or(0);
    let name_setter = config.name.as_ref().map(|n| quote! { .name(#n) });
    let executor_init = quote! {
        let __exekit_executor = ::exekit::executor::TestExecutor::with_config(
            ::exekit::executor::ExecutorConfig::new()
                .start_time(::std::time::Duration::from_secs(#start_time))
                #name_setter
        );
        #bind_param
    };

    let expanded = if input.sig.asyncness.is_some() {
        quote! {
            #[::core::prelude::v1::test]
            #(#attrs)*
            #vis fn #name() #output {
                #executor_init
                __exekit_executor
                    .block_on(async move #body)
                    .expect("test body stalled: no ready actions and no pending timers")
            }
        }
    } else {
        quote! {
            #[::core::prelude::v1::test]
            #(#attrs)*
            #vis fn #name() #output {
                #executor_init
                #body
            }
        }
    };

    Ok(expanded)
}
