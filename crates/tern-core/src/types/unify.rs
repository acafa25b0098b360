//! Structural unification over the arena

use super::arena::TypeArena;
use super::error::{TypeError, UnifyError};
use super::ty::{TypeId, TypeKind};
use crate::ast::Span;

/// Make `a` and `b` equal, binding free variables in place.
///
/// On failure the arena may hold bindings made before the conflicting pair
/// was reached; inference continues from that state.
pub fn unify(arena: &mut TypeArena, a: TypeId, b: TypeId, location: Span) -> Result<(), TypeError> {
    unify_types(arena, a, b).map_err(|err| TypeError::from_unify(err, location))
}

/// Location-free unification, used directly by tests and by [`unify`]
pub fn unify_types(arena: &mut TypeArena, a: TypeId, b: TypeId) -> Result<(), UnifyError> {
    let a = arena.resolve(a);
    let b = arena.resolve(b);
    if a == b {
        return Ok(());
    }

    tracing::trace!(left = %arena.to_type(a), right = %arena.to_type(b), "unify");

    match (arena.kind(a).clone(), arena.kind(b).clone()) {
        (TypeKind::Var(var), _) => bind_var(arena, var, b),
        (_, TypeKind::Var(var)) => bind_var(arena, var, a),

        (TypeKind::Num, TypeKind::Num)
        | (TypeKind::Bool, TypeKind::Bool)
        | (TypeKind::String, TypeKind::String)
        | (TypeKind::None, TypeKind::None)
        | (TypeKind::Unit, TypeKind::Unit) => Ok(()),

        (TypeKind::Fun(params_a, ret_a), TypeKind::Fun(params_b, ret_b)) => {
            if params_a.len() != params_b.len() {
                return Err(UnifyError::Arity {
                    expected: params_a.len(),
                    found: params_b.len(),
                });
            }
            for (pa, pb) in params_a.into_iter().zip(params_b) {
                unify_types(arena, pa, pb)?;
            }
            unify_types(arena, ret_a, ret_b)
        }

        (TypeKind::Array(ea), TypeKind::Array(eb)) => unify_types(arena, ea, eb),
        (TypeKind::Ref(ia), TypeKind::Ref(ib)) => unify_types(arena, ia, ib),

        (TypeKind::Record(fields_a), TypeKind::Record(fields_b)) => {
            if !fields_a.keys().eq(fields_b.keys()) {
                return Err(UnifyError::FieldMismatch {
                    expected: fields_a.into_keys().collect(),
                    found: fields_b.into_keys().collect(),
                });
            }
            for (ta, tb) in fields_a.into_values().zip(fields_b.into_values()) {
                unify_types(arena, ta, tb)?;
            }
            Ok(())
        }

        _ => Err(UnifyError::Mismatch {
            expected: arena.to_type(a),
            found: arena.to_type(b),
        }),
    }
}

fn bind_var(arena: &mut TypeArena, var: super::ty::VarId, to: TypeId) -> Result<(), UnifyError> {
    if arena.occurs(var, to) {
        return Err(UnifyError::InfiniteType {
            var,
            ty: arena.to_type(to),
        });
    }
    arena.bind(var, to);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Type, TypeErrorKind};
    use std::collections::BTreeMap;

    #[test]
    fn test_unify_identical_ground() {
        let mut arena = TypeArena::new();
        let num = arena.num();
        assert!(unify_types(&mut arena, num, num).is_ok());
        let a = arena.array(arena.bool());
        let b = arena.array(arena.bool());
        assert!(unify_types(&mut arena, a, b).is_ok());
    }

    #[test]
    fn test_unify_binds_var() {
        let mut arena = TypeArena::new();
        let v = arena.fresh_var();
        let s = arena.string();
        unify_types(&mut arena, v, s).unwrap();
        assert_eq!(arena.to_type(v), Type::String);
    }

    #[test]
    fn test_unify_mismatch() {
        let mut arena = TypeArena::new();
        let (b, n) = (arena.bool(), arena.num());
        let err = unify_types(&mut arena, b, n).unwrap_err();
        assert_eq!(
            err,
            UnifyError::Mismatch {
                expected: Type::Bool,
                found: Type::Num
            }
        );
    }

    #[test]
    fn test_unify_function_arity() {
        let mut arena = TypeArena::new();
        let f1 = arena.fun(vec![arena.num()], arena.num());
        let f2 = arena.fun(vec![arena.num(), arena.num()], arena.num());
        let err = unify_types(&mut arena, f1, f2).unwrap_err();
        assert!(matches!(err, UnifyError::Arity { expected: 1, found: 2 }));
        assert!(err.to_string().contains("arity"));
    }

    #[test]
    fn test_unify_function_structural() {
        let mut arena = TypeArena::new();
        let a = arena.fresh_var();
        let r = arena.fresh_var();
        let f1 = arena.fun(vec![a], r);
        let f2 = arena.fun(vec![arena.num()], arena.bool());
        unify_types(&mut arena, f1, f2).unwrap();
        assert_eq!(arena.to_type(f1), Type::fun(vec![Type::Num], Type::Bool));
    }

    #[test]
    fn test_occurs_check_fails() {
        let mut arena = TypeArena::new();
        let a = arena.fresh_var();
        let f = arena.fun(vec![a], arena.num());
        let err = unify(&mut arena, a, f, Span::line(4)).unwrap_err();
        assert_eq!(err.kind, TypeErrorKind::InfiniteType);
        assert_eq!(err.span, Span::line(4));
        // the variable stays free
        assert!(arena.as_free_var(a).is_some());
    }

    #[test]
    fn test_records_need_identical_field_sets() {
        let mut arena = TypeArena::new();
        let r1 = arena.record(BTreeMap::from([("x".to_string(), arena.num())]));
        let r2 = arena.record(BTreeMap::from([
            ("x".to_string(), arena.num()),
            ("y".to_string(), arena.num()),
        ]));
        let err = unify_types(&mut arena, r1, r2).unwrap_err();
        assert!(matches!(err, UnifyError::FieldMismatch { .. }));
    }

    #[test]
    fn test_records_unify_fieldwise() {
        let mut arena = TypeArena::new();
        let v = arena.fresh_var();
        let r1 = arena.record(BTreeMap::from([
            ("x".to_string(), v),
            ("y".to_string(), arena.bool()),
        ]));
        let r2 = arena.record(BTreeMap::from([
            ("y".to_string(), arena.bool()),
            ("x".to_string(), arena.string()),
        ]));
        unify_types(&mut arena, r1, r2).unwrap();
        assert_eq!(arena.to_type(v), Type::String);
    }

    #[test]
    fn test_ref_and_array_do_not_mix() {
        let mut arena = TypeArena::new();
        let r = arena.reference(arena.num());
        let a = arena.array(arena.num());
        assert!(unify_types(&mut arena, r, a).is_err());
    }
}
