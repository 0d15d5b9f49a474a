//! FromRow derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, Result};

#[derive(Default)]
struct FieldAttrs {
    column: Option<String>,
    default: bool,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "FromRow can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "FromRow can only be derived for structs",
            ));
        }
    };

    let mut field_extracts = Vec::with_capacity(fields.len());
    for field in fields {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let attrs = parse_field_attrs(field)?;

        if attrs.default {
            if attrs.column.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "`default` and `column` cannot be combined",
                ));
            }
            field_extracts.push(quote! {
                #field_name: ::core::default::Default::default()
            });
            continue;
        }

        let column_name = attrs.column.unwrap_or_else(|| field_name.to_string());
        field_extracts.push(quote! {
            #field_name: ::easql::RowExt::try_get_column(row, #column_name)?
        });
    }

    Ok(quote! {
        impl #impl_generics ::easql::FromRow for #name #ty_generics #where_clause {
            fn from_row(
                row: &::easql::tokio_postgres::Row,
            ) -> ::core::result::Result<Self, ::easql::DriverError> {
                ::core::result::Result::Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}

fn parse_field_attrs(field: &syn::Field) -> Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("easql") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                let lit: LitStr = meta.value()?.parse()?;
                attrs.column = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("default") {
                attrs.default = true;
                Ok(())
            } else {
                Err(meta.error("unknown easql attribute, expected `column` or `default`"))
            }
        })?;
    }
    Ok(attrs)
}
