use convert_case::{Case, Casing};
use quote::ToTokens;
use syn::{ItemStruct, LitStr, parse::ParseBuffer};

pub(crate) struct RecordMetadata {
    pub(crate) table: String,
    pub(crate) primary_key: String,
}

pub(crate) fn decode_record(item: &ItemStruct) -> RecordMetadata {
    let mut metadata = RecordMetadata {
        table: item.ident.to_string().to_case(Case::Snake),
        primary_key: "id".into(),
    };
    for attr in &item.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("record") {
            continue;
        }
        let Ok(list) = meta.require_list() else {
            panic!("Error while parsing `record`, use it like: `#[record(attribute = value, ...)]`");
        };
        let _ = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("table") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!(
                        "Error while parsing `table`, use it like: `#[record(table = \"{}\")]`",
                        metadata.table
                    );
                };
                metadata.table = v.value();
            } else if arg.path.is_ident("primary_key") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!(
                        "Error while parsing `primary_key`, use it like: `#[record(primary_key = \"id\")]`"
                    );
                };
                metadata.primary_key = v.value();
            } else {
                panic!(
                    "Unknown attribute `{}` inside record macro",
                    arg.path.to_token_stream()
                );
            }
            Ok(())
        });
    }
    metadata
}
