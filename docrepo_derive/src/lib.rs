use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, Token, parse_macro_input, spanned::Spanned};

/// Derives the `docrepo::EntityModel` metadata implementation for a struct
/// with named fields.
///
/// Recognized attributes:
/// - `#[container(name = "Items", partition_key_path = "/ownerId")]` on the
///   struct declares explicit container metadata; the path is optional and
///   must start with `/`.
/// - `#[partition_key]` on a field marks it as the partition key property.
///   At most one field may carry the marker.
/// - `#[entity(document)]` on the struct registers the type's
///   `DocumentEntity` implementation with the resolution engine, which then
///   takes precedence over marker and convention based key resolution.
///
/// Serialized property names honor `#[serde(rename = "...")]` and
/// `#[serde(rename_all = "...")]`; fields with `#[serde(skip)]` or
/// `#[serde(skip_serializing)]` are not part of the document and are
/// excluded from the metadata.
#[proc_macro_derive(Entity, attributes(container, partition_key, entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct ContainerArgs {
    name: String,
    partition_key_path: Option<String>,
}

#[derive(Default)]
struct EntityFlags {
    document: bool,
}

#[derive(Default)]
struct SerdeFieldArgs {
    rename: Option<String>,
    skip: bool,
}

fn expand_entity(input: DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let type_name = ident.to_string();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "#[derive(Entity)] is only supported on structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new(
            input.span(),
            "#[derive(Entity)] requires named fields",
        ));
    };

    let container = parse_container_attr(&input.attrs)?;
    let flags = parse_entity_attr(&input.attrs)?;
    let rename_all = parse_serde_rename_all(&input.attrs)?;

    let type_candidate = format!("{}_id", to_snake_case(&type_name));

    let mut partition_field: Option<String> = None;
    let mut properties = Vec::new();

    for field in &fields.named {
        let field_ident = field.ident.as_ref().expect("named field");
        let name = field_ident.to_string();

        let serde_args = parse_serde_field(&field.attrs)?;
        if serde_args.skip {
            continue;
        }

        let serialized = serde_args
            .rename
            .unwrap_or_else(|| apply_rename_all(rename_all.as_deref(), &name));

        let is_partition_key = field
            .attrs
            .iter()
            .any(|attr| attr.path().is_ident("partition_key"));

        if is_partition_key {
            if let Some(previous) = &partition_field {
                return Err(syn::Error::new(
                    field.span(),
                    format!(
                        "#[partition_key] is already declared on field `{previous}`; only one partition key field is allowed"
                    ),
                ));
            }
            partition_field = Some(name.clone());
        }

        // Only key candidate fields need an extraction function; everything
        // else participates in the metadata by name alone.
        let is_key_candidate =
            is_partition_key || name == "id" || name == "key" || name == type_candidate;

        let getter = if is_key_candidate {
            quote! {
                ::std::option::Option::Some(
                    |entity: &Self| ::docrepo::AsKeyValue::as_key_value(&entity.#field_ident),
                )
            }
        } else {
            quote!(::std::option::Option::None)
        };

        properties.push(quote! {
            ::docrepo::Property {
                name: #name,
                serialized_name: #serialized,
                partition_key: #is_partition_key,
                getter: #getter,
            }
        });
    }

    let container_fn = match container {
        Some(args) => {
            let name = args.name;
            let path = match args.partition_key_path {
                Some(path) => quote!(::std::option::Option::Some(#path)),
                None => quote!(::std::option::Option::None),
            };
            quote! {
                fn container() -> ::std::option::Option<::docrepo::ContainerMeta> {
                    ::std::option::Option::Some(::docrepo::ContainerMeta {
                        name: #name,
                        partition_key_path: #path,
                    })
                }
            }
        }
        None => quote!(),
    };

    let document_fn = if flags.document {
        quote! {
            fn document_accessors()
                -> ::std::option::Option<::docrepo::DocumentAccessors<Self>>
            {
                ::std::option::Option::Some(::docrepo::DocumentAccessors::<Self>::resolve())
            }
        }
    } else {
        quote!()
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::docrepo::EntityModel for #ident #ty_generics #where_clause {
            fn type_name() -> &'static str {
                #type_name
            }

            fn properties() -> ::std::vec::Vec<::docrepo::Property<Self>> {
                ::std::vec![#(#properties),*]
            }

            #container_fn

            #document_fn
        }
    })
}

fn parse_container_attr(attrs: &[syn::Attribute]) -> syn::Result<Option<ContainerArgs>> {
    for attr in attrs {
        if !attr.path().is_ident("container") {
            continue;
        }

        let mut name: Option<String> = None;
        let mut partition_key_path: Option<String> = None;

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                name = Some(lit.value());
                return Ok(());
            }
            if meta.path.is_ident("partition_key_path") {
                let lit: LitStr = meta.value()?.parse()?;
                if !lit.value().starts_with('/') {
                    return Err(syn::Error::new(
                        lit.span(),
                        format!("partition key path must start with '/': {}", lit.value()),
                    ));
                }
                partition_key_path = Some(lit.value());
                return Ok(());
            }
            Err(meta.error("expected `name` or `partition_key_path`"))
        })?;

        let Some(name) = name else {
            return Err(syn::Error::new_spanned(
                attr,
                "#[container(...)] requires a `name`",
            ));
        };

        return Ok(Some(ContainerArgs {
            name,
            partition_key_path,
        }));
    }

    Ok(None)
}

fn parse_entity_attr(attrs: &[syn::Attribute]) -> syn::Result<EntityFlags> {
    let mut flags = EntityFlags::default();

    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("document") {
                flags.document = true;
                return Ok(());
            }
            Err(meta.error("expected `document`"))
        })?;
    }

    Ok(flags)
}

fn parse_serde_rename_all(attrs: &[syn::Attribute]) -> syn::Result<Option<String>> {
    let mut rename_all = None;

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                if meta.input.peek(Token![=]) {
                    let lit: LitStr = meta.value()?.parse()?;
                    rename_all = Some(lit.value());
                } else {
                    // rename_all(serialize = "...", deserialize = "...")
                    meta.parse_nested_meta(|inner| {
                        let lit: LitStr = inner.value()?.parse()?;
                        if inner.path.is_ident("serialize") {
                            rename_all = Some(lit.value());
                        }
                        Ok(())
                    })?;
                }
                return Ok(());
            }
            consume_serde_meta(&meta)
        })?;
    }

    Ok(rename_all)
}

fn parse_serde_field(attrs: &[syn::Attribute]) -> syn::Result<SerdeFieldArgs> {
    let mut args = SerdeFieldArgs::default();

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if meta.input.peek(Token![=]) {
                    let lit: LitStr = meta.value()?.parse()?;
                    args.rename = Some(lit.value());
                } else {
                    meta.parse_nested_meta(|inner| {
                        let lit: LitStr = inner.value()?.parse()?;
                        if inner.path.is_ident("serialize") {
                            args.rename = Some(lit.value());
                        }
                        Ok(())
                    })?;
                }
                return Ok(());
            }
            if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                args.skip = true;
                return Ok(());
            }
            consume_serde_meta(&meta)
        })?;
    }

    Ok(args)
}

/// Consumes a serde meta item this macro does not interpret, so the nested
/// parse stays positioned on the next comma.
fn consume_serde_meta(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        let _value: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| {
            if inner.input.peek(Token![=]) {
                let _value: syn::Expr = inner.value()?.parse()?;
            }
            Ok(())
        })?;
    }
    Ok(())
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (index, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Applies a serde `rename_all` style to a snake_case field name, matching
/// serde's own conversions.
fn apply_rename_all(style: Option<&str>, name: &str) -> String {
    match style {
        Some("camelCase") => {
            let pascal = apply_rename_all(Some("PascalCase"), name);
            let mut chars = pascal.chars();
            match chars.next() {
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => pascal,
            }
        }
        Some("PascalCase") => name
            .split('_')
            .map(|segment| {
                let mut chars = segment.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect(),
        Some("lowercase") => name.to_lowercase(),
        Some("UPPERCASE") | Some("SCREAMING_SNAKE_CASE") => name.to_uppercase(),
        Some("kebab-case") => name.replace('_', "-"),
        Some("SCREAMING-KEBAB-CASE") => name.to_uppercase().replace('_', "-"),
        _ => name.to_string(),
    }
}
