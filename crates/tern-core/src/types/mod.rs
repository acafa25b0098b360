//! Type algebra, unification and environments

mod arena;
mod env;
mod error;
mod ty;
mod unify;

pub use arena::TypeArena;
pub use env::TypeEnv;
pub use error::{TypeError, TypeErrorKind, UnifyError};
pub use ty::{Type, TypeId, TypeKind, TypeScheme, VarId};
pub use unify::{unify, unify_types};
