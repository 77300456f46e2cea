mod decode_field;
mod decode_record;

use decode_field::decode_field;
use decode_record::decode_record;
use proc_macro::TokenStream;
use quote::{ToTokens, format_ident, quote};
use syn::{Fields, ItemStruct, parse_macro_input};

/// Implements `quarry::Record` for a struct with named fields.
///
/// Struct attribute: `#[record(table = "users", primary_key = "id")]`, the table defaults
/// to the snake case struct name and the primary key column to `id`.
/// Field attributes: `#[record(column = "full_name")]` and `#[record(skip)]`.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    if !item.generics.params.is_empty() {
        panic!("Record derive does not support generic structs");
    }
    let Fields::Named(..) = &item.fields else {
        panic!("Record derive supports only structs with named fields");
    };
    let name = &item.ident;
    let record = decode_record(&item);
    let table = &record.table;
    let primary_key = &record.primary_key;
    let fields: Vec<_> = item.fields.iter().map(decode_field).collect();
    let count = fields.len();
    let accessors = fields.iter().filter(|f| !f.skip).map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let get = format_ident!("__value_{}", f.name);
        let get_mut = format_ident!("__slot_{}", f.name);
        let is_zero = format_ident!("__zero_{}", f.name);
        quote! {
            fn #get(record: &#name) -> ::quarry::Value {
                <#ty as ::quarry::AsValue>::as_value(&record.#ident)
            }
            fn #get_mut(record: &mut #name) -> &mut dyn ::quarry::Destination {
                &mut record.#ident
            }
            fn #is_zero(record: &#name) -> bool {
                <#ty as ::quarry::AsValue>::is_zero(&record.#ident)
            }
        }
    });
    let entries = fields.iter().map(|f| {
        let field_name = &f.name;
        let column = match &f.column {
            Some(v) => quote!(Some(#v)),
            None => quote!(None),
        };
        if f.skip {
            return quote! {
                ::quarry::Field {
                    name: #field_name,
                    column: #column,
                    access: None,
                }
            };
        }
        let ty = &f.ty;
        let type_name = ty.to_token_stream().to_string().replace(' ', "");
        let get = format_ident!("__value_{}", f.name);
        let get_mut = format_ident!("__slot_{}", f.name);
        let is_zero = format_ident!("__zero_{}", f.name);
        quote! {
            ::quarry::Field {
                name: #field_name,
                column: #column,
                access: Some(::quarry::Access {
                    kind: <#ty as ::quarry::AsValue>::KIND,
                    type_name: #type_name,
                    get: #get,
                    get_mut: #get_mut,
                    is_zero: #is_zero,
                }),
            }
        }
    });
    quote! {
        impl ::quarry::Record for #name {
            fn table_name() -> &'static str {
                #table
            }

            fn primary_key_column() -> &'static str {
                #primary_key
            }

            fn fields() -> &'static [::quarry::Field<Self>] {
                #(#accessors)*
                static FIELDS: [::quarry::Field<#name>; #count] = [#(#entries),*];
                &FIELDS
            }
        }
    }
    .into()
}
