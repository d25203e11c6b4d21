pub mod color;
pub mod queue_type;
pub mod resource_state;
