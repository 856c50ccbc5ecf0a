//! Order domain entities.

pub mod item;
pub mod model;

pub use item::{NewOrderItem, OrderItem};
pub use model::{NewOrder, Order, OrderStatus};
