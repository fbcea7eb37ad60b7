//! The schema kinds and the factories that build them.

mod array;
mod intersection;
mod lazy;
mod leaf;
mod literal;
mod object;
mod pipe;
mod record;
mod union;

pub use array::{array, tuple, tuple_with_rest, ArrayDef};
pub use intersection::{intersection, IntersectionDef};
pub use lazy::{lazy, LazyDef};
pub use leaf::{
    any, boolean, custom, custom_check, float32, int, int16, int32, int8, never, null, number, string, uint16,
    uint32, uint8, unknown, AnyDef, BoolDef, CustomDef, IntDef, NeverDef, NullDef, NumberDef,
    StringDef,
};
pub use literal::{enum_, literal, literals, EnumDef, LiteralDef};
pub use object::{loose_object, object, strict_object, ObjectDef, UnknownKeys};
pub use pipe::{pipe, transform, PipeDef, TransformDef, TransformFn};
pub use record::{record, RecordDef};
pub use union::{discriminated_union, union, xor, DiscriminatedUnionDef, UnionDef};
