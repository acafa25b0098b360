//! Builtin functions visible to every module

use crate::types::{Type, TypeArena, TypeEnv, VarId};
use std::collections::{BTreeSet, HashMap};

/// Builtin names and their (polymorphic) signatures
pub fn builtins() -> Vec<(&'static str, Type)> {
    let a = || Type::Var(VarId(0));
    vec![
        ("print", Type::fun(vec![a()], Type::Unit)),
        ("len", Type::fun(vec![Type::array(a())], Type::Num)),
        ("str", Type::fun(vec![a()], Type::String)),
        ("push", Type::fun(vec![Type::array(a()), a()], Type::Unit)),
    ]
}

/// Environment holding every builtin, fully generalised
pub fn prelude_env(arena: &mut TypeArena) -> TypeEnv {
    builtins().into_iter().fold(TypeEnv::empty(), |env, (name, ty)| {
        let id = arena.from_type(&ty, &mut HashMap::new());
        let scheme = arena.generalize(id, &BTreeSet::new());
        env.extend(name, scheme)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_is_polymorphic() {
        let mut arena = TypeArena::new();
        let env = prelude_env(&mut arena);
        for (name, _) in builtins() {
            let scheme = env.lookup(name).unwrap();
            assert!(scheme.is_polymorphic(), "{name} should be generalised");
        }
        assert!(env.free_vars(&mut arena).is_empty());
    }
}
