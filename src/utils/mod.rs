pub mod data;
pub mod fdr;
pub mod name_matching;
pub mod odds;
pub mod player_data;
pub mod predicted_points;
pub mod probabilities;
