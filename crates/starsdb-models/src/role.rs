use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum RoleType {
    #[default]
    Unspecified,
    Director,
    Writer,
    Producer,
    Actor,
}

/// Natural key of a credit: who did what on which show.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RoleKey {
    #[serde(rename = "type")]
    pub role_type: RoleType,
    pub show: i64,
    pub talent: i64,
}

impl RoleKey {
    pub fn new(role_type: RoleType, show: i64, talent: i64) -> Self {
        Self {
            role_type,
            show,
            talent,
        }
    }
}

/// A credit with its synthetic id. The id is what shows reference in
/// `credits` / `principal_credits`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    #[serde(flatten)]
    pub key: RoleKey,
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

impl Role {
    pub fn new(key: RoleKey, id: i64) -> Self {
        Self { key, id, name: None }
    }

    pub fn role_type(&self) -> RoleType {
        self.key.role_type
    }

    pub fn show(&self) -> i64 {
        self.key.show
    }

    pub fn talent(&self) -> i64 {
        self.key.talent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_key_value_equality() {
        let a = RoleKey::new(RoleType::Actor, 1, 2);
        let b = RoleKey::new(RoleType::Actor, 1, 2);
        let c = RoleKey::new(RoleType::Writer, 1, 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_role_json_shape() {
        let mut role = Role::new(RoleKey::new(RoleType::Director, 111161, 1291), -5);
        role.name = Some("Director".to_string());

        let json = serde_json::to_value(&role).unwrap();
        assert_eq!(json["type"], "Director");
        assert_eq!(json["show"], 111161);
        assert_eq!(json["talent"], 1291);
        assert_eq!(json["id"], -5);

        let back: Role = serde_json::from_value(json).unwrap();
        assert_eq!(back, role);
    }
}
