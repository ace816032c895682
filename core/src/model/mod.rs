pub mod day_record;
pub mod member;
