use crate::ast::{DeclId, DeclKind, TemplateStatus};

/// What the walker does with one declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub emit_self: bool,
    pub visit_children: bool,
    /// Process this declaration instead (template wrappers are transparent).
    pub substitute: Option<DeclId>,
}

impl Classification {
    const fn new(
        emit_self: bool,
        visit_children: bool,
    ) -> Self {
        Self {
            emit_self,
            visit_children,
            substitute: None,
        }
    }

    pub const SKIP: Self = Self::new(false, false);

    pub fn is_skip(&self) -> bool {
        !self.emit_self && !self.visit_children && self.substitute.is_none()
    }
}

/// Decide emit/recurse/substitute for a declaration from its kind alone.
///
/// Implicit, macro-located, anonymous and out-of-file declarations are
/// rejected by the walker before this is consulted.
pub fn classify(kind: &DeclKind) -> Classification {
    match kind {
        DeclKind::Template {
            pattern: Some(pattern),
        } => Classification {
            emit_self: false,
            visit_children: false,
            substitute: Some(*pattern),
        },
        DeclKind::Template {
            pattern: None,
        } => Classification::new(true, false),
        DeclKind::Namespace | DeclKind::NamespaceAlias => Classification::new(false, true),
        // Parameters and locals inside a body are not worth a lens.
        DeclKind::Function | DeclKind::Method(_) => Classification::new(true, false),
        DeclKind::FunctionSpecialization {
            status, ..
        } => {
            if status.is_explicit() {
                Classification::new(true, false)
            } else {
                Classification::SKIP
            }
        },
        DeclKind::ClassSpecialization {
            status, ..
        } => match status {
            TemplateStatus::ImplicitInstantiation => Classification::SKIP,
            TemplateStatus::ExplicitInstantiation => Classification::new(true, false),
            TemplateStatus::ExplicitSpecialization => Classification::new(true, true),
        },
        DeclKind::Record(_) | DeclKind::Other => Classification::new(true, true),
    }
}

#[cfg(test)]
#[path = "../../tests/src/lens/classify_tests.rs"]
mod tests;
