//! Derive macro for bindery binding shapes.
//!
//! `#[derive(Describe)]` turns a struct with named fields into a composite
//! shape whose fields carry their value tags and validation rules.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    Data, DeriveInput, Field, Fields, GenericParam, LitStr, Path, parse_macro_input, parse_quote,
};

/// Derives `bindery_bind::Describe` for a struct with named fields.
///
/// Supported field attributes are `#[value("${key:=default}||splitter")]`,
/// `#[bind(embed)]`, `#[bind(skip)]` and `#[validate(name = "rule")]`.
///
/// The generated code refers to `::bindery_bind`. Crates reaching it through
/// a re-export name that path with `#[describe(crate = "bindery::bind")]`.
#[proc_macro_derive(Describe, attributes(describe, value, bind, validate))]
pub fn derive_describe(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct FieldAttrs {
    tag: Option<LitStr>,
    embed: bool,
    skip: bool,
    rules: Vec<(String, LitStr)>,
}

fn expand(mut input: DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Describe can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Describe requires named fields",
        ));
    };

    let krate = crate_path(&input)?;
    let mut specs = Vec::with_capacity(named.named.len());
    for field in &named.named {
        if let Some(spec) = field_spec(field, &krate)? {
            specs.push(spec);
        }
    }

    for param in &mut input.generics.params {
        match param {
            GenericParam::Type(ty) => {
                ty.bounds.push(parse_quote!(#krate::Describe));
                ty.bounds.push(parse_quote!('static));
            }
            GenericParam::Lifetime(lifetime) => {
                return Err(syn::Error::new_spanned(
                    lifetime,
                    "Describe cannot be derived for borrowed structs",
                ));
            }
            GenericParam::Const(_) => {}
        }
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics #krate::Describe for #ident #ty_generics #where_clause {
            fn shape() -> #krate::Shape {
                #krate::Shape::composite::<Self>(::std::vec![#(#specs),*])
            }
        }
    })
}

fn crate_path(input: &DeriveInput) -> syn::Result<Path> {
    let mut krate = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("describe") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let path: LitStr = meta.value()?.parse()?;
                krate = Some(path.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `crate = \"path\"`"))
            }
        })?;
    }
    Ok(krate.unwrap_or_else(|| parse_quote!(::bindery_bind)))
}

fn field_spec(field: &Field, krate: &Path) -> syn::Result<Option<TokenStream2>> {
    let attrs = field_attrs(field)?;
    if attrs.skip {
        return Ok(None);
    }
    let Some(ident) = &field.ident else {
        return Err(syn::Error::new_spanned(field, "expected a named field"));
    };
    let name = ident.unraw().to_string();
    let ty = &field.ty;
    let shape = quote!(<#ty as #krate::Describe>::shape);

    let mut spec = match (&attrs.tag, attrs.embed) {
        (Some(tag), false) => quote!(#krate::FieldSpec::tagged(#name, #tag, #shape)),
        (None, true) => quote!(#krate::FieldSpec::embedded(#name, #shape)),
        (None, false) => quote!(#krate::FieldSpec::nested(#name, #shape)),
        (Some(tag), true) => {
            return Err(syn::Error::new_spanned(
                tag,
                "an embedded field shares its parent's key and cannot carry a value tag",
            ));
        }
    };
    for (validator, rule) in &attrs.rules {
        spec = quote!(#spec.rule(#validator, #rule));
    }
    Ok(Some(spec))
}

fn field_attrs(field: &Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in &field.attrs {
        if attr.path().is_ident("value") {
            let tag: LitStr = attr.parse_args()?;
            let text = tag.value();
            match (text.find("${"), text.rfind('}')) {
                (Some(open), Some(close)) if open < close => {}
                _ => {
                    return Err(syn::Error::new_spanned(
                        &tag,
                        "value tag must look like `${key:=default}`",
                    ));
                }
            }
            attrs.tag = Some(tag);
        } else if attr.path().is_ident("bind") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("embed") {
                    attrs.embed = true;
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    attrs.skip = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `embed` or `skip`"))
                }
            })?;
        } else if attr.path().is_ident("validate") {
            attr.parse_nested_meta(|meta| {
                let name = meta
                    .path
                    .get_ident()
                    .ok_or_else(|| meta.error("expected a validator name"))?
                    .unraw()
                    .to_string();
                let rule: LitStr = meta.value()?.parse()?;
                attrs.rules.push((name, rule));
                Ok(())
            })?;
        }
    }
    Ok(attrs)
}
