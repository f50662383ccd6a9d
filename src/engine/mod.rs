//! Order lifecycle and rider-assignment core.
//!
//! Lock order is always rider lock first, then the order record. Nothing holds a map
//! guard across an `.await` and events go out only after every lock is released.

pub mod assignment;
pub mod lifecycle;
pub mod locations;
pub mod locks;
pub mod riders;

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::order::Order;

pub type OrderBook = DashMap<Uuid, Order>;
