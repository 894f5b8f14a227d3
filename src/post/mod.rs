pub mod list_controller;
pub mod memory_gateway;
pub mod post_controller;
pub mod post_gateway;
pub mod post_model;
pub mod post_service;
pub mod rest_gateway;
