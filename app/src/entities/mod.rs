pub mod bus_groups;
pub mod buses;
pub mod trips;

pub mod prelude {
    pub use super::bus_groups::Entity as BusGroups;
    pub use super::buses::Entity as Buses;
    pub use super::trips::Entity as Trips;
}
