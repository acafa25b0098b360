//! Arena-backed type storage with a union-find binding table
//!
//! Every type built during one inference session lives here. A variable node
//! `TypeKind::Var(v)` never changes; binding `v` writes `bindings[v]`, so all
//! `TypeId`s that point at the variable observe the binding at once.

use super::ty::{Type, TypeId, TypeKind, TypeScheme, VarId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy)]
struct Prims {
    num: TypeId,
    bool: TypeId,
    string: TypeId,
    none: TypeId,
    unit: TypeId,
}

#[derive(Debug, Clone)]
pub struct TypeArena {
    kinds: Vec<TypeKind>,
    /// Binding slot per variable; `None` while the variable is free
    bindings: Vec<Option<TypeId>>,
    prims: Prims,
}

impl TypeArena {
    pub fn new() -> Self {
        let mut kinds = Vec::with_capacity(64);
        let mut push = |kind| {
            kinds.push(kind);
            TypeId((kinds.len() - 1) as u32)
        };
        let prims = Prims {
            num: push(TypeKind::Num),
            bool: push(TypeKind::Bool),
            string: push(TypeKind::String),
            none: push(TypeKind::None),
            unit: push(TypeKind::Unit),
        };
        Self {
            kinds,
            bindings: Vec::new(),
            prims,
        }
    }

    fn alloc(&mut self, kind: TypeKind) -> TypeId {
        self.kinds.push(kind);
        TypeId((self.kinds.len() - 1) as u32)
    }

    pub fn fresh_var(&mut self) -> TypeId {
        let var = VarId(self.bindings.len() as u32);
        self.bindings.push(None);
        self.alloc(TypeKind::Var(var))
    }

    pub fn var_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn num(&self) -> TypeId {
        self.prims.num
    }

    pub fn bool(&self) -> TypeId {
        self.prims.bool
    }

    pub fn string(&self) -> TypeId {
        self.prims.string
    }

    pub fn none(&self) -> TypeId {
        self.prims.none
    }

    pub fn unit(&self) -> TypeId {
        self.prims.unit
    }

    pub fn fun(&mut self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        self.alloc(TypeKind::Fun(params, ret))
    }

    pub fn array(&mut self, elem: TypeId) -> TypeId {
        self.alloc(TypeKind::Array(elem))
    }

    pub fn record(&mut self, fields: BTreeMap<String, TypeId>) -> TypeId {
        self.alloc(TypeKind::Record(fields))
    }

    pub fn reference(&mut self, inner: TypeId) -> TypeId {
        self.alloc(TypeKind::Ref(inner))
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.kinds[id.index()]
    }

    /// Follow variable bindings to the representative node, compressing the
    /// chain so later lookups are one hop.
    pub fn resolve(&mut self, id: TypeId) -> TypeId {
        let TypeKind::Var(var) = self.kinds[id.index()] else {
            return id;
        };
        match self.bindings[var.0 as usize] {
            None => id,
            Some(next) => {
                let root = self.resolve(next);
                if root != next {
                    self.bindings[var.0 as usize] = Some(root);
                }
                root
            }
        }
    }

    /// Resolve, then return the free variable the type is, if any
    pub fn as_free_var(&mut self, id: TypeId) -> Option<VarId> {
        let root = self.resolve(id);
        match self.kinds[root.index()] {
            TypeKind::Var(var) => Some(var),
            _ => None,
        }
    }

    /// Bind a free variable. Callers run the occurs check first.
    pub(crate) fn bind(&mut self, var: VarId, to: TypeId) {
        debug_assert!(self.bindings[var.0 as usize].is_none(), "{var} bound twice");
        self.bindings[var.0 as usize] = Some(to);
    }

    /// Does `var` occur free inside `id` (after resolution)?
    pub fn occurs(&mut self, var: VarId, id: TypeId) -> bool {
        let root = self.resolve(id);
        match self.kinds[root.index()].clone() {
            TypeKind::Var(v) => v == var,
            TypeKind::Num | TypeKind::Bool | TypeKind::String | TypeKind::None | TypeKind::Unit => false,
            TypeKind::Fun(params, ret) => params.iter().any(|p| self.occurs(var, *p)) || self.occurs(var, ret),
            TypeKind::Array(inner) | TypeKind::Ref(inner) => self.occurs(var, inner),
            TypeKind::Record(fields) => fields.values().any(|t| self.occurs(var, *t)),
        }
    }

    pub fn free_vars(&mut self, id: TypeId) -> BTreeSet<VarId> {
        let mut vars = BTreeSet::new();
        self.collect_free_vars(id, &mut vars);
        vars
    }

    pub(crate) fn collect_free_vars(&mut self, id: TypeId, vars: &mut BTreeSet<VarId>) {
        let root = self.resolve(id);
        match self.kinds[root.index()].clone() {
            TypeKind::Var(v) => {
                vars.insert(v);
            }
            TypeKind::Num | TypeKind::Bool | TypeKind::String | TypeKind::None | TypeKind::Unit => {}
            TypeKind::Fun(params, ret) => {
                for param in params {
                    self.collect_free_vars(param, vars);
                }
                self.collect_free_vars(ret, vars);
            }
            TypeKind::Array(inner) | TypeKind::Ref(inner) => self.collect_free_vars(inner, vars),
            TypeKind::Record(fields) => {
                for ty in fields.into_values() {
                    self.collect_free_vars(ty, vars);
                }
            }
        }
    }

    /// Substitute every binding, producing an owned [`Type`]
    pub fn to_type(&mut self, id: TypeId) -> Type {
        let root = self.resolve(id);
        match self.kinds[root.index()].clone() {
            TypeKind::Var(v) => Type::Var(v),
            TypeKind::Num => Type::Num,
            TypeKind::Bool => Type::Bool,
            TypeKind::String => Type::String,
            TypeKind::None => Type::None,
            TypeKind::Unit => Type::Unit,
            TypeKind::Fun(params, ret) => {
                let params = params.into_iter().map(|p| self.to_type(p)).collect();
                Type::Fun(params, Box::new(self.to_type(ret)))
            }
            TypeKind::Array(inner) => Type::Array(Box::new(self.to_type(inner))),
            TypeKind::Ref(inner) => Type::Ref(Box::new(self.to_type(inner))),
            TypeKind::Record(fields) => Type::Record(
                fields
                    .into_iter()
                    .map(|(name, ty)| (name, self.to_type(ty)))
                    .collect(),
            ),
        }
    }

    /// Allocate arena nodes for an owned type. Variables are mapped through
    /// `vars`, creating fresh ones on first sight.
    pub fn from_type(&mut self, ty: &Type, vars: &mut HashMap<VarId, TypeId>) -> TypeId {
        match ty {
            Type::Var(v) => *vars.entry(*v).or_insert_with(|| self.fresh_var()),
            Type::Num => self.num(),
            Type::Bool => self.bool(),
            Type::String => self.string(),
            Type::None => self.none(),
            Type::Unit => self.unit(),
            Type::Fun(params, ret) => {
                let params = params.iter().map(|p| self.from_type(p, vars)).collect();
                let ret = self.from_type(ret, vars);
                self.fun(params, ret)
            }
            Type::Array(inner) => {
                let inner = self.from_type(inner, vars);
                self.array(inner)
            }
            Type::Ref(inner) => {
                let inner = self.from_type(inner, vars);
                self.reference(inner)
            }
            Type::Record(fields) => {
                let fields = fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), self.from_type(ty, vars)))
                    .collect();
                self.record(fields)
            }
        }
    }

    /// Quantify the variables free in `id` but not in `env_free`
    pub fn generalize(&mut self, id: TypeId, env_free: &BTreeSet<VarId>) -> TypeScheme {
        let vars = self
            .free_vars(id)
            .into_iter()
            .filter(|v| !env_free.contains(v))
            .collect();
        TypeScheme { vars, body: id }
    }

    /// Fresh monomorphic copy of a scheme for one use site
    pub fn instantiate(&mut self, scheme: &TypeScheme) -> TypeId {
        if scheme.vars.is_empty() {
            return scheme.body;
        }
        let mut subst: HashMap<VarId, TypeId> = HashMap::new();
        for var in &scheme.vars {
            let fresh = self.fresh_var();
            subst.insert(*var, fresh);
        }
        self.substitute(scheme.body, &subst)
    }

    fn substitute(&mut self, id: TypeId, subst: &HashMap<VarId, TypeId>) -> TypeId {
        let root = self.resolve(id);
        match self.kinds[root.index()].clone() {
            TypeKind::Var(v) => subst.get(&v).copied().unwrap_or(root),
            TypeKind::Num | TypeKind::Bool | TypeKind::String | TypeKind::None | TypeKind::Unit => root,
            TypeKind::Fun(params, ret) => {
                let params = params.into_iter().map(|p| self.substitute(p, subst)).collect();
                let ret = self.substitute(ret, subst);
                self.fun(params, ret)
            }
            TypeKind::Array(inner) => {
                let inner = self.substitute(inner, subst);
                self.array(inner)
            }
            TypeKind::Ref(inner) => {
                let inner = self.substitute(inner, subst);
                self.reference(inner)
            }
            TypeKind::Record(fields) => {
                let fields = fields
                    .into_iter()
                    .map(|(name, ty)| (name, self.substitute(ty, subst)))
                    .collect();
                self.record(fields)
            }
        }
    }
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_unbound_var_is_itself() {
        let mut arena = TypeArena::new();
        let v = arena.fresh_var();
        assert_eq!(arena.resolve(v), v);
        assert!(arena.as_free_var(v).is_some());
    }

    #[test]
    fn test_resolve_follows_chain_and_compresses() {
        let mut arena = TypeArena::new();
        let a = arena.fresh_var();
        let b = arena.fresh_var();
        let c = arena.fresh_var();
        let va = arena.as_free_var(a).unwrap();
        let vb = arena.as_free_var(b).unwrap();
        let vc = arena.as_free_var(c).unwrap();
        arena.bind(va, b);
        arena.bind(vb, c);
        arena.bind(vc, arena.num());

        assert_eq!(arena.resolve(a), arena.num());
        // compressed straight to the root
        assert_eq!(arena.bindings[va.0 as usize], Some(arena.num()));
        assert_eq!(arena.to_type(a), Type::Num);
    }

    #[test]
    fn test_instantiate_gives_fresh_vars() {
        let mut arena = TypeArena::new();
        let a = arena.fresh_var();
        let id = arena.fun(vec![a], a);
        let scheme = arena.generalize(id, &BTreeSet::new());
        assert_eq!(scheme.vars.len(), 1);

        let first = arena.instantiate(&scheme);
        let second = arena.instantiate(&scheme);
        let (Type::Fun(p1, _), Type::Fun(p2, _)) = (arena.to_type(first), arena.to_type(second)) else {
            panic!("expected function types");
        };
        assert_ne!(p1, p2);
    }

    #[test]
    fn test_generalize_respects_env_vars() {
        let mut arena = TypeArena::new();
        let a = arena.fresh_var();
        let b = arena.fresh_var();
        let id = arena.fun(vec![a], b);
        let env_free = BTreeSet::from([arena.as_free_var(a).unwrap()]);
        let scheme = arena.generalize(id, &env_free);
        assert_eq!(scheme.vars, BTreeSet::from([arena.as_free_var(b).unwrap()]));
    }

    #[test]
    fn test_occurs_through_binding() {
        let mut arena = TypeArena::new();
        let a = arena.fresh_var();
        let b = arena.fresh_var();
        let va = arena.as_free_var(a).unwrap();
        let vb = arena.as_free_var(b).unwrap();
        let arr = arena.array(a);
        arena.bind(vb, arr);
        assert!(arena.occurs(va, b));
        assert!(!arena.occurs(va, arena.num()));
    }

    #[test]
    fn test_from_type_shares_vars() {
        let mut arena = TypeArena::new();
        let ty = Type::fun(vec![Type::Var(VarId(90))], Type::Var(VarId(90)));
        let mut vars = HashMap::new();
        let id = arena.from_type(&ty, &mut vars);
        assert_eq!(vars.len(), 1);
        let TypeKind::Fun(params, ret) = arena.kind(id).clone() else {
            panic!("expected function");
        };
        assert_eq!(params[0], ret);
    }
}
