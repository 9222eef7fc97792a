pub mod catalog_product;
