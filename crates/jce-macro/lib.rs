//! `#[derive(Jce)]`: builds a `Schema` and `Encodable`/`Decodable` impls
//! from a plain struct declaration.
//!
//! Per-field attributes: `#[jce(id = N)]` (required, wire field id),
//! `#[jce(default = expr)]` (optional declared default), `#[jce(non_wire)]`
//! (the field is never iterated by the encoder and is populated only from
//! the caller-supplied extras map on decode).

use darling::{util::Flag, FromAttributes};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Type};

#[derive(Debug, Default, FromAttributes)]
#[darling(attributes(jce))]
struct JceFieldArgs {
    #[darling(default)]
    id: Option<u8>,
    #[darling(default)]
    default: Option<syn::Expr>,
    #[darling(default)]
    non_wire: Flag,
}

struct FieldPlan {
    ident: syn::Ident,
    ty: Type,
    id: u8,
    default: Option<syn::Expr>,
    non_wire: bool,
}

#[proc_macro_derive(Jce, attributes(jce))]
pub fn derive_jce(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let struct_name = &input.ident;

    let Data::Struct(data) = &input.data else {
        return syn::Error::new_spanned(&input, "#[derive(Jce)] only supports structs")
            .to_compile_error()
            .into();
    };
    let Fields::Named(fields) = &data.fields else {
        return syn::Error::new_spanned(&input, "#[derive(Jce)] requires named fields")
            .to_compile_error()
            .into();
    };

    let mut plans = Vec::new();
    for field in &fields.named {
        let args = match JceFieldArgs::from_attributes(&field.attrs) {
            Ok(a) => a,
            Err(e) => return e.write_errors().into(),
        };
        let ident = field.ident.clone().unwrap();
        let non_wire = args.non_wire.is_present();
        if !non_wire && args.id.is_none() {
            return syn::Error::new_spanned(
                &field.ident,
                "#[derive(Jce)] fields need #[jce(id = N)] unless marked #[jce(non_wire)]",
            )
            .to_compile_error()
            .into();
        }
        plans.push(FieldPlan {
            ident,
            ty: field.ty.clone(),
            id: args.id.unwrap_or(0),
            default: args.default,
            non_wire,
        });
    }

    let schema_fields = plans.iter().map(|f| {
        let name = f.ident.to_string();
        let id = f.id;
        if f.non_wire {
            let default = f
                .default
                .clone()
                .unwrap_or_else(|| syn::parse_quote!(::std::default::Default::default()));
            quote! {
                builder = builder.non_wire_field(#name, ::jcewire::value::Value::from(#default));
            }
        } else {
            let wire_type = infer_wire_type(&f.ty);
            match &f.default {
                Some(default) => quote! {
                    builder = builder.field_with_default(#name, #id, #wire_type, ::jcewire::value::Value::from(#default));
                },
                None => quote! {
                    builder = builder.field(#name, #id, #wire_type);
                },
            }
        }
    });

    let field_value_arms = plans.iter().filter(|f| !f.non_wire).map(|f| {
        let ident = &f.ident;
        let id = f.id;
        quote! {
            #id => Some(::jcewire::value::Value::from(self.#ident.clone())),
        }
    });

    let from_fields_wire = plans.iter().filter(|f| !f.non_wire).map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let id = f.id;
        let name = f.ident.to_string();
        quote! {
            let #ident: #ty = match fields.remove(&#id) {
                Some(v) => ::std::convert::TryFrom::try_from(v).map_err(|e: ::jcewire::value::WrongKind| {
                    ::jcewire::error::Error::TypeMismatch {
                        field_id: #id as u16,
                        expected: e.expected,
                        actual: e.actual,
                    }
                })?,
                None => return Err(::jcewire::error::Error::MissingField(#name.to_string(), #id)),
            };
        }
    });

    let from_fields_non_wire = plans.iter().filter(|f| f.non_wire).map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let name = f.ident.to_string();
        quote! {
            let #ident: #ty = match extras.remove(#name) {
                Some(v) => ::std::convert::TryFrom::try_from(v).map_err(|e: ::jcewire::value::WrongKind| {
                    ::jcewire::error::Error::TypeMismatch {
                        field_id: 0,
                        expected: e.expected,
                        actual: e.actual,
                    }
                })?,
                None => return Err(::jcewire::error::Error::MissingField(#name.to_string(), 0)),
            };
        }
    });

    let field_idents = plans.iter().map(|f| &f.ident);

    let expanded = quote! {
        impl ::jcewire::codec::Encodable for #struct_name {
            fn schema() -> &'static ::jcewire::schema::Schema {
                static SCHEMA: ::std::sync::OnceLock<::jcewire::schema::Schema> = ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    let mut builder = ::jcewire::schema::Schema::new();
                    #(#schema_fields)*
                    builder.build().expect("derived schema is well-formed")
                })
            }

            fn field_value(&self, field_id: u8) -> Option<::jcewire::value::Value> {
                match field_id {
                    #(#field_value_arms)*
                    _ => None,
                }
            }
        }

        impl ::jcewire::codec::Decodable for #struct_name {
            fn schema() -> &'static ::jcewire::schema::Schema {
                <#struct_name as ::jcewire::codec::Encodable>::schema()
            }

            fn from_fields(
                mut fields: ::jcewire::value::FieldBag,
                mut extras: ::jcewire::value::ExtraMap,
            ) -> ::jcewire::error::Result<Self> {
                #(#from_fields_wire)*
                #(#from_fields_non_wire)*
                Ok(Self { #(#field_idents),* })
            }
        }
    };

    expanded.into()
}

/// Infers a declared wire type from a field's Rust type, performed once at
/// schema-build time rather than per decode. Unsupported types are a
/// compile error rather than a runtime `UnknownType`, since the mapping is
/// static.
fn infer_wire_type(ty: &Type) -> proc_macro2::TokenStream {
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            let name = segment.ident.to_string();
            return match name.as_str() {
                "i8" => quote! { ::jcewire::wire::WT_BYTE },
                "bool" => quote! { ::jcewire::wire::WT_BYTE },
                "i16" | "i32" | "i64" | "u8" | "u16" | "u32" => {
                    quote! { ::jcewire::wire::WT_INT32 }
                }
                "f32" => quote! { ::jcewire::wire::WT_FLOAT32 },
                "f64" => quote! { ::jcewire::wire::WT_FLOAT64 },
                "String" => quote! { ::jcewire::wire::WT_SHORT_STRING },
                "Vec" => {
                    if is_vec_of_u8(path) {
                        quote! { ::jcewire::wire::WT_BYTE_ARRAY }
                    } else {
                        quote! { ::jcewire::wire::WT_LIST }
                    }
                }
                other => {
                    return syn::Error::new_spanned(
                        ty,
                        format!("#[derive(Jce)] cannot infer a wire type for `{other}`; declare it explicitly"),
                    )
                    .to_compile_error()
                }
            };
        }
    }
    syn::Error::new_spanned(ty, "#[derive(Jce)] cannot infer a wire type for this field")
        .to_compile_error()
}

fn is_vec_of_u8(path: &syn::TypePath) -> bool {
    let Some(segment) = path.path.segments.last() else {
        return false;
    };
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return false;
    };
    matches!(
        args.args.first(),
        Some(syn::GenericArgument::Type(Type::Path(inner)))
            if inner.path.is_ident("u8")
    )
}
