use crate::error::Result;
use crate::models::Version;
use colored::*;
use std::cmp::Ordering;

pub struct CompareCommand;

impl CompareCommand {
    pub fn new() -> Result<Self> {
        Ok(Self)
    }

    pub fn execute(&self, left: &str, right: &str) -> Result<()> {
        let ordering = compare(left, right)?;
        let symbol = match ordering {
            Ordering::Less => "<",
            Ordering::Equal => "=",
            Ordering::Greater => ">",
        };
        println!("{left} {} {right}", symbol.bold());
        Ok(())
    }
}

fn compare(left: &str, right: &str) -> Result<Ordering> {
    let left = left.parse::<Version>()?;
    let right = right.parse::<Version>()?;
    Ok(left.cmp(&right))
}
