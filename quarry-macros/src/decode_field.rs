use quote::ToTokens;
use syn::{Field, Ident, LitStr, Type, ext::IdentExt, parse::ParseBuffer};

pub(crate) struct FieldMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    /// Field name as declared, without the raw identifier prefix.
    pub(crate) name: String,
    pub(crate) column: Option<String>,
    pub(crate) skip: bool,
}

pub(crate) fn decode_field(field: &Field) -> FieldMetadata {
    let ident = field
        .ident
        .clone()
        .expect("Record derive supports only structs with named fields");
    let mut metadata = FieldMetadata {
        name: ident.unraw().to_string(),
        ident,
        ty: field.ty.clone(),
        column: None,
        skip: false,
    };
    for attr in &field.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("record") {
            continue;
        }
        let Ok(list) = meta.require_list() else {
            panic!("Error while parsing `record`, use it like: `#[record(attribute = value, ...)]`");
        };
        let _ = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("column") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!(
                        "Error while parsing `column`, use it like: `#[record(column = \"my_column\")]`"
                    );
                };
                metadata.column = Some(v.value());
            } else if arg.path.is_ident("skip") {
                let Err(..) = arg.value() else {
                    // value() is Err for Meta::Path
                    panic!("Error while parsing `skip`, use it like: `#[record(skip)]`");
                };
                metadata.skip = true;
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
