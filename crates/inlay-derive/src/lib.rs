use proc_macro::TokenStream;

mod record;

/// Derive the static descriptor, accessor table, and `Record` impl for a
/// named-field struct (plus `Entity` when the struct carries an identity
/// field). See the `record` module for attribute handling.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input.into()).into()
}
