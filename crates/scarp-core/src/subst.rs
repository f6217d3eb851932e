//! Type variable substitution.
//!
//! A [`Substitution`] maps variable names to replacement types and,
//! independently, gives replacements for the implicit `instance`/`class`
//! self-type markers. Applying a substitution always produces new values.

use rustc_hash::FxHashMap;

use crate::types::{Type, VarName};

#[derive(Debug, Clone, Default)]
pub struct Substitution {
    dictionary: FxHashMap<VarName, Type>,
    instance_type: Option<Type>,
    module_type: Option<Type>,
}

impl Substitution {
    pub fn empty() -> Substitution {
        Substitution::default()
    }

    /// Pair up `params` with `args` positionally.
    ///
    /// Callers are expected to hand over matching lengths; an instantiation
    /// with the empty argument list is the conventional way to leave a
    /// template's parameters untouched.
    pub fn build(params: &[VarName], args: &[Type]) -> Substitution {
        debug_assert!(
            args.is_empty() || args.len() == params.len(),
            "substitution arity mismatch: {} params, {} args",
            params.len(),
            args.len()
        );
        let dictionary = params.iter().cloned().zip(args.iter().cloned()).collect();
        Substitution {
            dictionary,
            instance_type: None,
            module_type: None,
        }
    }

    pub fn add(&mut self, name: VarName, ty: Type) {
        self.dictionary.insert(name, ty);
    }

    pub fn with_instance_type(mut self, ty: Option<Type>) -> Substitution {
        self.instance_type = ty;
        self
    }

    pub fn with_module_type(mut self, ty: Option<Type>) -> Substitution {
        self.module_type = ty;
        self
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.dictionary.get(name)
    }

    pub fn instance_type(&self) -> Option<&Type> {
        self.instance_type.as_ref()
    }

    pub fn module_type(&self) -> Option<&Type> {
        self.module_type.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.dictionary.is_empty() && self.instance_type.is_none() && self.module_type.is_none()
    }

    /// A copy of this substitution with `names` removed from the
    /// dictionary. Method types use this to shield their own bound type
    /// parameters from capture by an enclosing substitution.
    pub fn without(&self, names: &[VarName]) -> Substitution {
        if names.iter().all(|name| !self.dictionary.contains_key(name)) {
            return self.clone();
        }
        let dictionary = self
            .dictionary
            .iter()
            .filter(|(name, _)| !names.contains(name))
            .map(|(name, ty)| (name.clone(), ty.clone()))
            .collect();
        Substitution {
            dictionary,
            instance_type: self.instance_type.clone(),
            module_type: self.module_type.clone(),
        }
    }
}
