use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub roles: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    LoadOwner,
    VehicleOwner,
    System,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadOwner => "load_owner",
            Self::VehicleOwner => "vehicle_owner",
            Self::System => "system",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "load_owner" => Some(Self::LoadOwner),
            "vehicle_owner" => Some(Self::VehicleOwner),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

impl User {
    pub fn new(id: Uuid, roles: &[Role]) -> Self {
        Self {
            id,
            roles: roles.iter().map(|role| role.name().to_string()).collect(),
        }
    }

    pub fn new_system_user() -> Self {
        Self::new(Uuid::new_v4(), &[Role::System])
    }

    pub fn load_owner() -> Self {
        Self::new(Uuid::new_v4(), &[Role::LoadOwner])
    }

    pub fn vehicle_owner() -> Self {
        Self::new(Uuid::new_v4(), &[Role::VehicleOwner])
    }

    fn id_equals(&self, id: Uuid) -> bool {
        self.id == id
    }

    fn has_role(&self, role: String) -> bool {
        self.roles.iter().any(|x| x == &role)
    }
}

impl PolarClass for User {
    fn get_polar_class_builder() -> oso::ClassBuilder<User> {
        oso::Class::builder()
            .name("User")
            .add_attribute_getter("id", |recv: &User| recv.id)
            .add_attribute_getter("roles", |recv: &User| recv.roles.clone())
            .add_method("id_equals", User::id_equals)
            .add_method("has_role", User::has_role)
    }

    fn get_polar_class() -> oso::Class {
        let builder = User::get_polar_class_builder();
        builder.build()
    }
}
