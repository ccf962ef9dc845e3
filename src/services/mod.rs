// Inventory views, export and scan links built on top of the store

pub mod export;
pub mod inventory;
pub mod scan;
