pub mod aquaculture;
