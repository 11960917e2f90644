mod extract_subgraphs;
mod schema_model;
