use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Role {
    Patient => "patient",
    Lab => "lab",
    Phlebotomist => "phlebotomist",
});

str_enum!(MessageStatus {
    Sent => "sent",
    Delivered => "delivered",
    Read => "read",
});

str_enum!(ParticipantPair {
    PatientLab => "patient_lab",
    PatientPhlebotomist => "patient_phlebotomist",
    LabPhlebotomist => "lab_phlebotomist",
});

impl ParticipantPair {
    /// The two conversing roles, in canonical order.
    pub fn roles(&self) -> [Role; 2] {
        match self {
            Self::PatientLab => [Role::Patient, Role::Lab],
            Self::PatientPhlebotomist => [Role::Patient, Role::Phlebotomist],
            Self::LabPhlebotomist => [Role::Lab, Role::Phlebotomist],
        }
    }

    /// Canonical pair for two roles, in either order. `None` for a
    /// same-role combination.
    pub fn from_roles(a: Role, b: Role) -> Option<Self> {
        match (a, b) {
            (Role::Patient, Role::Lab) | (Role::Lab, Role::Patient) => Some(Self::PatientLab),
            (Role::Patient, Role::Phlebotomist) | (Role::Phlebotomist, Role::Patient) => {
                Some(Self::PatientPhlebotomist)
            }
            (Role::Lab, Role::Phlebotomist) | (Role::Phlebotomist, Role::Lab) => {
                Some(Self::LabPhlebotomist)
            }
            (Role::Patient, Role::Patient)
            | (Role::Lab, Role::Lab)
            | (Role::Phlebotomist, Role::Phlebotomist) => None,
        }
    }

    pub fn contains(&self, role: Role) -> bool {
        self.roles().contains(&role)
    }

    /// The conversing role other than `role`, if `role` is part of the pair.
    pub fn other(&self, role: Role) -> Option<Role> {
        let [a, b] = self.roles();
        if role == a {
            Some(b)
        } else if role == b {
            Some(a)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips() {
        for role in [Role::Patient, Role::Lab, Role::Phlebotomist] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn role_rejects_unknown() {
        assert!(Role::from_str("admin").is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Lab).unwrap(), "\"lab\"");
        assert_eq!(
            serde_json::to_string(&Role::Phlebotomist).unwrap(),
            "\"phlebotomist\""
        );
    }

    #[test]
    fn pair_from_roles_is_symmetric() {
        assert_eq!(
            ParticipantPair::from_roles(Role::Patient, Role::Lab),
            ParticipantPair::from_roles(Role::Lab, Role::Patient),
        );
        assert_eq!(
            ParticipantPair::from_roles(Role::Lab, Role::Phlebotomist),
            Some(ParticipantPair::LabPhlebotomist),
        );
    }

    #[test]
    fn pair_rejects_same_role() {
        assert_eq!(ParticipantPair::from_roles(Role::Lab, Role::Lab), None);
    }

    #[test]
    fn pair_other_role() {
        let pair = ParticipantPair::PatientLab;
        assert_eq!(pair.other(Role::Patient), Some(Role::Lab));
        assert_eq!(pair.other(Role::Lab), Some(Role::Patient));
        assert_eq!(pair.other(Role::Phlebotomist), None);
    }

    #[test]
    fn status_round_trips() {
        assert_eq!(
            MessageStatus::from_str("read").unwrap(),
            MessageStatus::Read
        );
        assert_eq!(MessageStatus::Sent.as_str(), "sent");
    }
}
