//! Proc macro for mapping `#[repr(C)]` structs to HDF5 compound datatypes.
//!
//! `#[derive(H5Type)]` implements `h5cmem_types::H5Type` and, for structs
//! without lifetime parameters, `h5cmem_types::H5Decode`. Member offsets come
//! from `core::mem::offset_of!`, so the descriptor always agrees with the
//! compiler's layout.
//!
//! ```ignore
//! #[derive(H5Type)]
//! #[repr(C)]
//! struct Reading {
//!     id: u32,
//!     #[hdf5(rename = "T")]
//!     temperature: f64,
//!     tags: Vec<u8>,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, parse_quote, Data, DeriveInput, Field, Fields, GenericParam, Generics,
    LitStr,
};

/// Derive macro generating the compound descriptor and C-layout codec.
///
/// # Field attributes
/// - `#[hdf5(rename = "name")]` uses `name` verbatim as the member name.
///
/// # Requirements
/// - named fields, at least one
/// - `#[repr(C)]`, not packed
/// - a `Box<T>` or `&T` field is laid out as `T` in the pointer's slot, so
///   `T` must fit in pointer width; wider targets are rejected with
///   `InvalidMember` / `InlinePointer` errors
#[proc_macro_derive(H5Type, attributes(hdf5))]
pub fn derive_h5type(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match impl_h5type(&input) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

struct Member<'a> {
    field: &'a Field,
    ident: &'a syn::Ident,
    name: String,
}

fn impl_h5type(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "H5Type can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "H5Type can only be derived for structs",
            ));
        }
    };
    if fields.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "H5Type requires at least one field",
        ));
    }
    check_repr_c(input)?;

    let members = fields
        .iter()
        .map(|field| {
            let ident = field
                .ident
                .as_ref()
                .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
            let name = member_name(field)?.unwrap_or_else(|| ident.to_string());
            Ok(Member { field, ident, name })
        })
        .collect::<syn::Result<Vec<_>>>()?;

    let h5type = h5type_impl(name, &input.generics, &members);
    let h5decode = if input.generics.lifetimes().next().is_some() {
        quote! {}
    } else {
        h5decode_impl(name, &input.generics, &members)
    };

    Ok(quote! {
        #h5type
        #h5decode
    })
}

fn h5type_impl(name: &syn::Ident, generics: &Generics, members: &[Member<'_>]) -> TokenStream2 {
    let generics = add_bounds(generics, quote!(::h5cmem_types::H5Type));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let depth_stmts = members.iter().map(|m| {
        let ty = &m.field.ty;
        quote! {
            if <#ty as ::h5cmem_types::H5Type>::POINTER_DEPTH > depth {
                depth = <#ty as ::h5cmem_types::H5Type>::POINTER_DEPTH;
            }
        }
    });

    let insert_stmts = members.iter().map(|m| {
        let ty = &m.field.ty;
        let ident = m.ident;
        let member = &m.name;
        let overflow = inline_overflow(ty);
        quote! {
            if #overflow {
                return Err(::h5cmem_types::Error::InvalidMember {
                    name: #member.into(),
                    reason: ::std::format!(
                        "pointer target needs {} bytes but the field holds {}",
                        <#ty as ::h5cmem_types::H5Type>::SIZE,
                        ::core::mem::size_of::<#ty>(),
                    ),
                });
            }
            builder.insert(
                #member,
                ::core::mem::offset_of!(Self, #ident),
                <#ty as ::h5cmem_types::H5Type>::type_descriptor()?,
            )?;
        }
    });

    let encode_stmts = members.iter().map(|m| {
        let ident = m.ident;
        let overflow = inline_overflow(&m.field.ty);
        let member = &m.name;
        quote! {
            if #overflow {
                return Err(::h5cmem_types::EncodingError::InlinePointer { member: #member });
            }
            enc.set_offset(base + ::core::mem::offset_of!(Self, #ident));
            enc.encode(&self.#ident)?;
            enc.set_offset(base + <Self as ::h5cmem_types::H5Type>::SIZE);
        }
    });

    quote! {
        impl #impl_generics ::h5cmem_types::H5Type for #name #ty_generics #where_clause {
            const SIZE: usize = ::core::mem::size_of::<Self>();

            const POINTER_DEPTH: usize = {
                let mut depth = 0usize;
                #(#depth_stmts)*
                depth
            };

            fn type_descriptor() -> ::h5cmem_types::Result<::h5cmem_types::TypeDescriptor> {
                let mut builder =
                    ::h5cmem_types::CompoundBuilder::new(<Self as ::h5cmem_types::H5Type>::SIZE);
                #(#insert_stmts)*
                Ok(builder.build())
            }

            fn encode(
                &self,
                enc: &mut ::h5cmem_types::Encoder,
            ) -> ::core::result::Result<(), ::h5cmem_types::EncodingError> {
                let base = enc.offset();
                #(#encode_stmts)*
                Ok(())
            }
        }
    }
}

fn h5decode_impl(name: &syn::Ident, generics: &Generics, members: &[Member<'_>]) -> TokenStream2 {
    let generics = add_bounds(generics, quote!(::h5cmem_types::H5Decode));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let bindings: Vec<_> = members
        .iter()
        .map(|m| format_ident!("__h5_{}", m.ident))
        .collect();

    let decode_stmts = members.iter().zip(&bindings).map(|(m, binding)| {
        let ty = &m.field.ty;
        let ident = m.ident;
        let overflow = inline_overflow(ty);
        let member = &m.name;
        quote! {
            if #overflow {
                return Err(::h5cmem_types::DecodingError::InlinePointer { member: #member });
            }
            dec.set_offset(base + ::core::mem::offset_of!(Self, #ident));
            let #binding = <#ty as ::h5cmem_types::H5Decode>::decode(dec)?;
        }
    });
    let idents = members.iter().map(|m| m.ident);

    quote! {
        impl #impl_generics ::h5cmem_types::H5Decode for #name #ty_generics #where_clause {
            fn decode(
                dec: &mut ::h5cmem_types::Decoder<'_>,
            ) -> ::core::result::Result<Self, ::h5cmem_types::DecodingError> {
                let base = dec.offset();
                #(#decode_stmts)*
                dec.set_offset(base + <Self as ::h5cmem_types::H5Type>::SIZE);
                Ok(Self { #(#idents: #bindings),* })
            }
        }
    }
}

/// True when a `Box`/`&` field's target is laid out wider than the pointer
/// slot the field occupies.
fn inline_overflow(ty: &syn::Type) -> TokenStream2 {
    quote! {
        <#ty as ::h5cmem_types::H5Type>::SIZE > ::core::mem::size_of::<#ty>()
    }
}

fn add_bounds(generics: &Generics, bound: TokenStream2) -> Generics {
    let mut generics = generics.clone();
    let params: Vec<_> = generics
        .params
        .iter()
        .filter_map(|p| match p {
            GenericParam::Type(t) => Some(t.ident.clone()),
            _ => None,
        })
        .collect();
    let where_clause = generics.make_where_clause();
    for ident in params {
        where_clause.predicates.push(parse_quote!(#ident: #bound));
    }
    generics
}

/// The struct must have `repr(C)` and must not be packed.
fn check_repr_c(input: &DeriveInput) -> syn::Result<()> {
    let mut is_c = false;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("repr")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("C") {
                is_c = true;
                return Ok(());
            }
            if meta.path.is_ident("packed") {
                return Err(meta.error("H5Type does not support packed structs"));
            }
            if meta.input.peek(syn::token::Paren) {
                let _args;
                syn::parenthesized!(_args in meta.input);
            }
            Ok(())
        })?;
    }
    if !is_c {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "H5Type requires #[repr(C)]",
        ));
    }
    Ok(())
}

fn member_name(field: &Field) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("hdf5")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                if lit.value().is_empty() {
                    return Err(syn::Error::new_spanned(lit, "member name cannot be empty"));
                }
                rename = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unsupported hdf5 attribute, expected `rename`"))
            }
        })?;
    }
    Ok(rename)
}
