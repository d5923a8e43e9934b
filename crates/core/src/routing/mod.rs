pub mod bin_router;
