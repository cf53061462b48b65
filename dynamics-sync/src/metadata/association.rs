//! Statically declared association descriptors
//!
//! An association connects two roles. Each end names the entity set playing
//! the role, how many entities may sit on that end, and optionally the
//! navigation property declared on that end's entity type which points at
//! the *other* end. Associations backed by foreign-key columns carry a
//! referential constraint naming the principal and dependent roles.

use serde::{Deserialize, Serialize};

/// Number of entities that may appear on one end of an association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    One,
    ZeroOrOne,
    Many,
}

impl Multiplicity {
    pub fn is_many(self) -> bool {
        matches!(self, Multiplicity::Many)
    }
}

/// One end of an association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationEnd {
    pub role: String,
    pub entity_set: String,
    pub multiplicity: Multiplicity,
    /// Navigation on this end's type pointing at the other end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation: Option<String>,
}

impl AssociationEnd {
    pub fn new(role: impl Into<String>, entity_set: impl Into<String>, multiplicity: Multiplicity) -> Self {
        Self {
            role: role.into(),
            entity_set: entity_set.into(),
            multiplicity,
            navigation: None,
        }
    }

    pub fn navigation(mut self, name: impl Into<String>) -> Self {
        self.navigation = Some(name.into());
        self
    }
}

/// Foreign-key constraint: dependent properties reference principal key properties.
///
/// `principal_properties` must follow the key order of the principal entity set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferentialConstraint {
    pub principal_role: String,
    pub dependent_role: String,
    pub principal_properties: Vec<String>,
    pub dependent_properties: Vec<String>,
}

impl ReferentialConstraint {
    pub fn new(
        principal_role: impl Into<String>,
        dependent_role: impl Into<String>,
        principal_properties: &[&str],
        dependent_properties: &[&str],
    ) -> Self {
        Self {
            principal_role: principal_role.into(),
            dependent_role: dependent_role.into(),
            principal_properties: principal_properties.iter().map(|p| p.to_string()).collect(),
            dependent_properties: dependent_properties.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Pairs of (principal property, dependent property)
    pub fn property_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.principal_properties
            .iter()
            .zip(&self.dependent_properties)
            .map(|(p, d)| (p.as_str(), d.as_str()))
    }
}

/// Inverse navigation reached from one role: the navigation declared on the
/// opposite end, and the multiplicity of the entities it will hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inverse<'a> {
    pub navigation: &'a str,
    pub multiplicity: Multiplicity,
}

/// A bidirectional association between two roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub name: String,
    pub ends: [AssociationEnd; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<ReferentialConstraint>,
}

impl Association {
    pub fn new(name: impl Into<String>, first: AssociationEnd, second: AssociationEnd) -> Self {
        Self {
            name: name.into(),
            ends: [first, second],
            constraint: None,
        }
    }

    pub fn constraint(mut self, constraint: ReferentialConstraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// End playing the given role
    pub fn end(&self, role: &str) -> Option<&AssociationEnd> {
        self.ends.iter().find(|e| e.role == role)
    }

    /// End opposite the given role
    pub fn opposite(&self, role: &str) -> Option<&AssociationEnd> {
        let i = self.ends.iter().position(|e| e.role == role)?;
        Some(&self.ends[1 - i])
    }

    /// Whether `role` is the dependent (foreign-key owning) side
    pub fn is_dependent(&self, role: &str) -> bool {
        self.constraint.as_ref().is_some_and(|c| c.dependent_role == role)
    }

    /// The navigation on the other end that points back at `role`.
    ///
    /// The returned multiplicity is the one of `role`'s end: a many-valued
    /// end means the inverse is a collection.
    pub fn inverse_of(&self, role: &str) -> Option<Inverse<'_>> {
        let own = self.end(role)?;
        let navigation = self.opposite(role)?.navigation.as_deref()?;
        Some(Inverse {
            navigation,
            multiplicity: own.multiplicity,
        })
    }

    /// Whether any dependent foreign-key property appears in `properties`
    pub fn is_reference_changed<S: AsRef<str>>(&self, properties: &[S]) -> bool {
        self.constraint.as_ref().is_some_and(|c| {
            c.dependent_properties
                .iter()
                .any(|d| properties.iter().any(|p| p.as_ref() == d))
        })
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("association name is empty".to_string());
        }
        let [first, second] = &self.ends;
        if first.role == second.role {
            return Err(format!("both ends use role '{}'", first.role));
        }
        for end in &self.ends {
            if end.entity_set.trim().is_empty() {
                return Err(format!("end '{}' has no entity set", end.role));
            }
        }
        if let Some(c) = &self.constraint {
            if c.principal_role == c.dependent_role {
                return Err("principal and dependent roles are the same".to_string());
            }
            for role in [&c.principal_role, &c.dependent_role] {
                if self.end(role).is_none() {
                    return Err(format!("constraint names unknown role '{}'", role));
                }
            }
            if c.principal_properties.is_empty() {
                return Err("constraint has no properties".to_string());
            }
            if c.principal_properties.len() != c.dependent_properties.len() {
                return Err(format!(
                    "constraint maps {} principal properties to {} dependent properties",
                    c.principal_properties.len(),
                    c.dependent_properties.len()
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee_manager() -> Association {
        Association::new(
            "Employee_Manager",
            AssociationEnd::new("Manager", "Employees", Multiplicity::ZeroOrOne).navigation("Reports"),
            AssociationEnd::new("Employee", "Employees", Multiplicity::Many).navigation("Manager"),
        )
        .constraint(ReferentialConstraint::new("Manager", "Employee", &["Id"], &["ManagerId"]))
    }

    #[test]
    fn test_inverse_of_dependent_role_is_collection() {
        let association = employee_manager();
        let inverse = association.inverse_of("Employee").unwrap();

        assert_eq!(inverse.navigation, "Reports");
        assert_eq!(inverse.multiplicity, Multiplicity::Many);
    }

    #[test]
    fn test_inverse_of_principal_role_is_reference() {
        let association = employee_manager();
        let inverse = association.inverse_of("Manager").unwrap();

        assert_eq!(inverse.navigation, "Manager");
        assert!(!inverse.multiplicity.is_many());
    }

    #[test]
    fn test_dependent_and_reference_change_detection() {
        let association = employee_manager();

        assert!(association.is_dependent("Employee"));
        assert!(!association.is_dependent("Manager"));
        assert!(association.is_reference_changed(&["Name", "ManagerId"]));
        assert!(!association.is_reference_changed(&["Name"]));
    }

    #[test]
    fn test_validation_rejects_mismatched_constraint() {
        let association = employee_manager()
            .constraint(ReferentialConstraint::new("Manager", "Employee", &["Id"], &["A", "B"]));
        assert!(association.validate().is_err());

        let association = employee_manager()
            .constraint(ReferentialConstraint::new("Boss", "Employee", &["Id"], &["ManagerId"]));
        assert!(association.validate().unwrap_err().contains("Boss"));

        assert!(employee_manager().validate().is_ok());
    }
}
