//! Type registry (component C4)
//!
//! Primitive type sizes plus named struct/enum/class registries and
//! the helper predicates the code generator needs to lay out fields,
//! compute sizes, and resolve `EnumName::Variant` references.

use crate::ast::TypeAnnotation;
use std::collections::HashMap;

/// Byte size of a scalar type, matching x86-64 SysV natural sizes.
pub fn primitive_size(ty: &TypeAnnotation) -> Option<usize> {
    use TypeAnnotation::*;
    Some(match ty {
        Int | Int64 | Uint64 => 8,
        Int32 | Uint32 | Float => 4,
        Int16 | Uint16 => 2,
        Int8 | Uint8 | Bool => 1,
        String => 8,     // pointer to bytes
        Pointer(_) => 8,
        Array(elem, count) => primitive_size(elem)? * count,
        Named(_) => return None, // resolved via TypeRegistry
    })
}

pub fn is_integer_type(ty: &TypeAnnotation) -> bool {
    use TypeAnnotation::*;
    matches!(ty, Int | Int8 | Int16 | Int32 | Int64 | Uint8 | Uint16 | Uint32 | Uint64)
}

pub fn is_pointer_type(ty: &TypeAnnotation) -> bool {
    matches!(ty, TypeAnnotation::Pointer(_) | TypeAnnotation::String)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: TypeAnnotation,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    pub name: String,
    pub fields: Vec<StructField>,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumLayout {
    pub name: String,
    pub variants: HashMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMethod {
    pub name: String,
    /// Mangled symbol used in the emitted assembly, e.g. `Point__distance`.
    pub symbol: String,
    pub ret_ty: TypeAnnotation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassLayout {
    pub name: String,
    pub fields: Vec<StructField>,
    pub size: usize,
    pub methods: HashMap<String, ClassMethod>,
}

/// The process-wide (per-compilation) registry of user-defined
/// aggregate types, populated while walking top-level declarations
/// and consulted throughout code generation.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    structs: HashMap<String, StructLayout>,
    enums: HashMap<String, EnumLayout>,
    classes: HashMap<String, ClassLayout>,
}

/// Lay out fields in declaration order, each aligned to its own size
/// (spec §4.3 "Aggregates: Structs").
fn layout_fields(fields: &[(String, TypeAnnotation)], registry: &TypeRegistry) -> (Vec<StructField>, usize) {
    let mut offset = 0usize;
    let mut laid_out = Vec::with_capacity(fields.len());
    for (name, ty) in fields {
        let size = registry.size_of(ty).unwrap_or(8);
        let align = size.max(1);
        if offset % align != 0 {
            offset += align - (offset % align);
        }
        laid_out.push(StructField { name: name.clone(), ty: ty.clone(), offset });
        offset += size;
    }
    (laid_out, offset)
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    pub fn define_struct(&mut self, name: &str, fields: &[(String, TypeAnnotation)]) {
        let (laid_out, size) = layout_fields(fields, self);
        self.structs.insert(
            name.to_string(),
            StructLayout { name: name.to_string(), fields: laid_out, size },
        );
    }

    pub fn define_enum(&mut self, name: &str, variants: &[(String, i64)]) {
        let map = variants.iter().cloned().collect();
        self.enums.insert(name.to_string(), EnumLayout { name: name.to_string(), variants: map });
    }

    pub fn define_class(
        &mut self,
        name: &str,
        fields: &[(String, TypeAnnotation)],
        methods: Vec<ClassMethod>,
    ) {
        let (laid_out, size) = layout_fields(fields, self);
        let methods = methods.into_iter().map(|m| (m.name.clone(), m)).collect();
        self.classes.insert(
            name.to_string(),
            ClassLayout { name: name.to_string(), fields: laid_out, size, methods },
        );
    }

    pub fn get_struct(&self, name: &str) -> Option<&StructLayout> {
        self.structs.get(name)
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumLayout> {
        self.enums.get(name)
    }

    pub fn get_class(&self, name: &str) -> Option<&ClassLayout> {
        self.classes.get(name)
    }

    pub fn enum_variant_value(&self, enum_name: &str, variant: &str) -> Option<i64> {
        self.enums.get(enum_name)?.variants.get(variant).copied()
    }

    pub fn is_aggregate_name(&self, name: &str) -> bool {
        self.structs.contains_key(name) || self.classes.contains_key(name)
    }

    /// Byte size of any type annotation, resolving `Named` against the
    /// registry. Defaults to a pointer-sized 8 for forward references
    /// that have not been registered yet.
    pub fn size_of(&self, ty: &TypeAnnotation) -> Option<usize> {
        if let Some(size) = primitive_size(ty) {
            return Some(size);
        }
        match ty {
            TypeAnnotation::Named(name) => {
                if let Some(s) = self.structs.get(name) {
                    Some(s.size)
                } else if let Some(c) = self.classes.get(name) {
                    Some(c.size)
                } else if self.enums.contains_key(name) {
                    Some(8)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_fields_laid_out_in_order_with_natural_alignment() {
        let mut reg = TypeRegistry::new();
        reg.define_struct(
            "Point",
            &[
                ("flag".to_string(), TypeAnnotation::Bool),
                ("x".to_string(), TypeAnnotation::Int),
                ("y".to_string(), TypeAnnotation::Int),
            ],
        );
        let layout = reg.get_struct("Point").unwrap();
        assert_eq!(layout.fields[0].offset, 0);
        // `x` (8-byte) is realigned to offset 8, not 1.
        assert_eq!(layout.fields[1].offset, 8);
        assert_eq!(layout.fields[2].offset, 16);
        assert_eq!(layout.size, 24);
    }

    #[test]
    fn enum_variants_resolve_to_integers() {
        let mut reg = TypeRegistry::new();
        reg.define_enum("Color", &[("Red".to_string(), 0), ("Green".to_string(), 1)]);
        assert_eq!(reg.enum_variant_value("Color", "Green"), Some(1));
        assert_eq!(reg.enum_variant_value("Color", "Blue"), None);
    }
}
