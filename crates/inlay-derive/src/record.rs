use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Error, Fields, GenericArgument, LitStr, PathArguments, Type};

// derive_record
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    match expand(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

///
/// StructAttrs
///

#[derive(Default)]
struct StructAttrs {
    table: Option<String>,
    preload: Option<syn::Path>,
    postload: Option<syn::Path>,
}

///
/// FieldAttrs
///

#[derive(Default)]
struct FieldAttrs {
    column: Option<String>,
    skip: bool,
    sealed: bool,
    embed: bool,
    codec: bool,
    id: bool,
}

///
/// Kind
/// Mirrors `FieldKind`; fixed per field at derive time.
///

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Text,
    Blob,
    Integer,
    Real,
    Boolean,
    Embed,
    Codec,
    Json,
}

struct FieldModel<'a> {
    ident: &'a syn::Ident,
    name: String,
    column: String,
    optional: bool,
    effective_ty: &'a Type,
    kind: Kind,
    sealed: bool,
    skip: bool,
}

fn expand(input: &DeriveInput) -> Result<TokenStream, Error> {
    let ident = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            other => {
                return Err(Error::new_spanned(
                    other,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(Error::new_spanned(
                ident,
                "Record can only be derived for structs with named fields",
            ));
        }
    };

    let struct_attrs = parse_struct_attrs(input)?;
    let mut models = Vec::with_capacity(fields.len());
    let mut identity: Option<usize> = None;

    for (index, field) in fields.iter().enumerate() {
        let field_ident = field.ident.as_ref().expect("named field");
        let attrs = parse_field_attrs(field)?;

        if attrs.embed && attrs.codec {
            return Err(Error::new_spanned(
                field,
                "a field cannot be both embed and codec",
            ));
        }

        let (optional, effective_ty) = match option_inner(&field.ty) {
            Some(inner) => (true, inner),
            None => (false, &field.ty),
        };

        let kind = classify(effective_ty, &attrs);
        let name = field_ident.to_string();
        let is_identity = attrs.id || (name == "id" && type_ident_is(effective_ty, "EntityId"));
        if is_identity {
            if identity.is_some() {
                return Err(Error::new_spanned(field, "duplicate identity field"));
            }
            identity = Some(index);
        }

        models.push(FieldModel {
            ident: field_ident,
            column: attrs.column.unwrap_or_else(|| name.clone()),
            name,
            optional,
            effective_ty,
            kind,
            sealed: attrs.sealed,
            skip: attrs.skip,
        });
    }

    let accessors: Vec<TokenStream> = models.iter().map(accessor_fns).collect();
    let descriptors: Vec<TokenStream> = models.iter().map(field_descriptor).collect();
    let field_count = models.len();

    let table = struct_attrs
        .table
        .unwrap_or_else(|| ident.to_string());
    let table_lit = LitStr::new(&table, ident.span());

    let identity_tokens = identity.map_or_else(
        || quote!(::core::option::Option::None),
        |index| quote!(::core::option::Option::Some(#index)),
    );

    let preload_tokens = hook_tokens(ident, struct_attrs.preload.as_ref(), "preload");
    let postload_tokens = hook_tokens(ident, struct_attrs.postload.as_ref(), "postload");
    let preload_value = struct_attrs_hook_value(struct_attrs_has(&preload_tokens), "__preload");
    let postload_value = struct_attrs_hook_value(struct_attrs_has(&postload_tokens), "__postload");

    let entity_impl = identity.map(|index| {
        let id_ident = models[index].ident;
        quote! {
            impl ::inlay::traits::Entity for #ident {
                fn id(&self) -> ::inlay::types::EntityId {
                    self.#id_ident
                }

                fn set_id(&mut self, id: ::inlay::types::EntityId) {
                    self.#id_ident = id;
                }
            }
        }
    });

    Ok(quote! {
        const _: () = {
            fn __record_ref(
                instance: &dyn ::core::any::Any,
            ) -> ::core::result::Result<&#ident, ::inlay::codec::DecodeError> {
                instance
                    .downcast_ref::<#ident>()
                    .ok_or_else(|| ::inlay::codec::DecodeError::message("record instance type mismatch"))
            }

            fn __record_mut(
                instance: &mut dyn ::core::any::Any,
            ) -> ::core::result::Result<&mut #ident, ::inlay::codec::DecodeError> {
                instance
                    .downcast_mut::<#ident>()
                    .ok_or_else(|| ::inlay::codec::DecodeError::message("record instance type mismatch"))
            }

            fn __construct() -> ::std::boxed::Box<dyn ::core::any::Any> {
                ::std::boxed::Box::new(<#ident as ::core::default::Default>::default())
            }

            #preload_tokens
            #postload_tokens

            #(#accessors)*

            static FIELDS: [::inlay::model::FieldDescriptor; #field_count] = [#(#descriptors),*];

            static DESCRIPTOR: ::inlay::model::RecordDescriptor = ::inlay::model::RecordDescriptor {
                path: ::core::concat!(::core::module_path!(), "::", ::core::stringify!(#ident)),
                table: #table_lit,
                identity: #identity_tokens,
                fields: &FIELDS,
                construct: __construct,
                preload: #preload_value,
                postload: #postload_value,
            };

            impl ::inlay::traits::Record for #ident {
                fn descriptor() -> &'static ::inlay::model::RecordDescriptor {
                    &DESCRIPTOR
                }
            }

            #entity_impl
        };
    })
}

fn struct_attrs_has(tokens: &TokenStream) -> bool {
    !tokens.is_empty()
}

fn struct_attrs_hook_value(present: bool, name: &str) -> TokenStream {
    if present {
        let ident = format_ident!("{name}");
        quote!(::core::option::Option::Some(#ident))
    } else {
        quote!(::core::option::Option::None)
    }
}

fn hook_tokens(ident: &syn::Ident, path: Option<&syn::Path>, which: &str) -> TokenStream {
    let Some(path) = path else {
        return TokenStream::new();
    };
    let wrapper = format_ident!("__{which}");

    quote! {
        fn #wrapper(instance: &mut dyn ::core::any::Any) {
            if let ::core::option::Option::Some(rec) = instance.downcast_mut::<#ident>() {
                #path(rec);
            }
        }
    }
}

fn parse_struct_attrs(input: &DeriveInput) -> Result<StructAttrs, Error> {
    let mut out = StructAttrs::default();

    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                out.table = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("preload") {
                out.preload = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("postload") {
                out.postload = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported record attribute"))
            }
        })?;
    }

    Ok(out)
}

fn parse_field_attrs(field: &syn::Field) -> Result<FieldAttrs, Error> {
    let mut out = FieldAttrs::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                let lit: LitStr = meta.value()?.parse()?;
                out.column = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("skip") {
                out.skip = true;
                Ok(())
            } else if meta.path.is_ident("sealed") {
                out.sealed = true;
                Ok(())
            } else if meta.path.is_ident("embed") {
                out.embed = true;
                Ok(())
            } else if meta.path.is_ident("codec") {
                out.codec = true;
                Ok(())
            } else if meta.path.is_ident("id") {
                out.id = true;
                Ok(())
            } else {
                Err(meta.error("unsupported record attribute"))
            }
        })?;
    }

    Ok(out)
}

fn classify(ty: &Type, attrs: &FieldAttrs) -> Kind {
    if attrs.embed {
        return Kind::Embed;
    }
    if attrs.codec {
        return Kind::Codec;
    }
    if is_byte_vec(ty) {
        return Kind::Blob;
    }
    if type_ident_is(ty, "String") {
        return Kind::Text;
    }
    if ["i8", "i16", "i32", "i64", "u8", "u16", "u32"]
        .iter()
        .any(|name| type_ident_is(ty, name))
        || type_ident_is(ty, "EntityId")
    {
        return Kind::Integer;
    }
    if type_ident_is(ty, "f32") || type_ident_is(ty, "f64") {
        return Kind::Real;
    }
    if type_ident_is(ty, "bool") {
        return Kind::Boolean;
    }

    Kind::Json
}

fn accessor_fns(model: &FieldModel<'_>) -> TokenStream {
    let bind_ident = format_ident!("__bind_{}", model.ident);
    let assign_ident = format_ident!("__assign_{}", model.ident);
    let field_ident = model.ident;
    let effective_ty = model.effective_ty;

    let bind_body = if model.skip || model.kind == Kind::Embed || model.sealed {
        quote!(::core::result::Result::Ok(::core::option::Option::None))
    } else if model.kind == Kind::Json {
        if model.optional {
            quote! {
                match rec.#field_ident.as_ref() {
                    ::core::option::Option::Some(value) => {
                        ::inlay::map::encode_json(value).map(::core::option::Option::Some)
                    }
                    ::core::option::Option::None => ::core::result::Result::Ok(
                        ::core::option::Option::Some(::inlay::value::SqlValue::Null),
                    ),
                }
            }
        } else {
            quote! {
                ::inlay::map::encode_json(&rec.#field_ident).map(::core::option::Option::Some)
            }
        }
    } else {
        quote! {
            ::core::result::Result::Ok(::core::option::Option::Some(
                ::inlay::codec::ColumnEncode::encode(&rec.#field_ident),
            ))
        }
    };

    let bind_uses_rec = !(model.skip || model.kind == Kind::Embed || model.sealed);
    let bind_prelude = if bind_uses_rec {
        quote!(let rec = __record_ref(instance)?;)
    } else {
        quote!(let _ = instance;)
    };

    let absent_arm = if model.optional {
        quote!(rec.#field_ident = ::core::option::Option::None)
    } else {
        // non-optional fields keep their empty-instance value
        quote!(())
    };

    let assign_arms = if model.skip {
        quote! {
            _ => {}
        }
    } else {
        match model.kind {
            Kind::Embed => {
                let store = if model.optional {
                    quote!(rec.#field_ident = ::core::option::Option::Some(*nested))
                } else {
                    quote!(rec.#field_ident = *nested)
                };
                quote! {
                    ::inlay::model::FieldWrite::Absent => #absent_arm,
                    ::inlay::model::FieldWrite::Nested(boxed) => {
                        let nested = boxed.downcast::<#effective_ty>().map_err(|_| {
                            ::inlay::codec::DecodeError::message("embedded value type mismatch")
                        })?;
                        #store
                    }
                    _ => {
                        return ::core::result::Result::Err(::inlay::codec::DecodeError::message(
                            "unsupported write for embedded field",
                        ));
                    }
                }
            }
            Kind::Json if !model.sealed => {
                let store = if model.optional {
                    quote! {
                        rec.#field_ident =
                            ::core::option::Option::Some(::inlay::map::decode_json(value)?)
                    }
                } else {
                    quote!(rec.#field_ident = ::inlay::map::decode_json(value)?)
                };
                quote! {
                    ::inlay::model::FieldWrite::Absent => #absent_arm,
                    ::inlay::model::FieldWrite::Json(value) => #store,
                    _ => {
                        return ::core::result::Result::Err(::inlay::codec::DecodeError::message(
                            "unsupported write for JSON field",
                        ));
                    }
                }
            }
            Kind::Json => quote! {
                ::inlay::model::FieldWrite::Absent => #absent_arm,
                _ => {
                    return ::core::result::Result::Err(::inlay::codec::DecodeError::message(
                        "sealed field cannot decode a raw column value",
                    ));
                }
            },
            _ => {
                let store = if model.optional {
                    quote! {
                        rec.#field_ident = ::core::option::Option::Some(
                            ::inlay::codec::ColumnDecode::decode(value)?,
                        )
                    }
                } else {
                    quote!(rec.#field_ident = ::inlay::codec::ColumnDecode::decode(value)?)
                };
                quote! {
                    ::inlay::model::FieldWrite::Absent => #absent_arm,
                    ::inlay::model::FieldWrite::Value(value) => #store,
                    _ => {
                        return ::core::result::Result::Err(::inlay::codec::DecodeError::message(
                            "unsupported write for this field",
                        ));
                    }
                }
            }
        }
    };

    // a sealed non-optional field only ever keeps its default, so the
    // generated arm never touches the instance
    let assign_uses_rec =
        !model.skip && (model.optional || !(model.kind == Kind::Json && model.sealed));
    let assign_prelude = if assign_uses_rec {
        quote!(let rec = __record_mut(instance)?;)
    } else {
        quote!(let _ = instance;)
    };

    quote! {
        fn #bind_ident(
            instance: &dyn ::core::any::Any,
        ) -> ::core::result::Result<
            ::core::option::Option<::inlay::value::SqlValue>,
            ::inlay::codec::DecodeError,
        > {
            #bind_prelude
            #bind_body
        }

        fn #assign_ident(
            instance: &mut dyn ::core::any::Any,
            write: ::inlay::model::FieldWrite,
        ) -> ::core::result::Result<(), ::inlay::codec::DecodeError> {
            #assign_prelude
            match write {
                #assign_arms
            }
            ::core::result::Result::Ok(())
        }
    }
}

fn field_descriptor(model: &FieldModel<'_>) -> TokenStream {
    let bind_ident = format_ident!("__bind_{}", model.ident);
    let assign_ident = format_ident!("__assign_{}", model.ident);
    let name = LitStr::new(&model.name, model.ident.span());
    let column = LitStr::new(&model.column, model.ident.span());
    let optional = model.optional;
    let sealed = model.sealed;
    let skip = model.skip;
    let effective_ty = model.effective_ty;

    let kind = match model.kind {
        Kind::Text => quote!(::inlay::model::FieldKind::Text),
        Kind::Blob => quote!(::inlay::model::FieldKind::Blob),
        Kind::Integer => {
            quote!(::inlay::model::FieldKind::Scalar(::inlay::model::ScalarClass::Integer))
        }
        Kind::Real => {
            quote!(::inlay::model::FieldKind::Scalar(::inlay::model::ScalarClass::Real))
        }
        Kind::Boolean => {
            quote!(::inlay::model::FieldKind::Scalar(::inlay::model::ScalarClass::Boolean))
        }
        Kind::Embed => quote! {
            ::inlay::model::FieldKind::Embed(
                <#effective_ty as ::inlay::traits::Record>::descriptor,
            )
        },
        Kind::Codec => quote!(::inlay::model::FieldKind::Codec),
        Kind::Json => quote!(::inlay::model::FieldKind::Json),
    };

    quote! {
        ::inlay::model::FieldDescriptor {
            name: #name,
            column: #column,
            optional: #optional,
            sealed: #sealed,
            skip: #skip,
            kind: #kind,
            bind: #bind_ident,
            assign: #assign_ident,
        }
    }
}

fn option_inner(ty: &Type) -> Option<&Type> {
    single_generic_arg(ty, "Option")
}

fn is_byte_vec(ty: &Type) -> bool {
    single_generic_arg(ty, "Vec").is_some_and(|inner| type_ident_is(inner, "u8"))
}

fn single_generic_arg<'a>(ty: &'a Type, ident: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != ident {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn type_ident_is(ty: &Type, ident: &str) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    path.path
        .segments
        .last()
        .is_some_and(|segment| segment.ident == ident && segment.arguments.is_none())
}
