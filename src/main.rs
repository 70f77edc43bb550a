use std::process;
use std::sync::{Arc, Mutex};

use pagedb::exec::{Comparator, Projection, Selection, Table};
use pagedb::{
    Attribute, AttributeType, BufferPool, EngineConfig, QueryOperator, SharedBufferPool,
    MAX_RECORDS,
};

fn main() {
    let config = EngineConfig::default();
    let pool = match BufferPool::from_config(&config) {
        Ok(pool) => pool,
        Err(error) => {
            eprintln!("Failed to open storage: {}", error);
            process::exit(1);
        }
    };
    let pool = Arc::new(Mutex::new(pool));

    if let Err(error) = run(&pool) {
        eprintln!("Error: {}", error);
        process::exit(1);
    }
}

fn run(pool: &SharedBufferPool) -> Result<(), Box<dyn std::error::Error>> {
    // build a three-page demo table of (k, "Test", k % 2 == 0) rows
    let mut page_ids = Vec::new();
    {
        let mut guard = pool.lock().unwrap();
        for _ in 0..3 {
            let page_id = guard.allocate()?;
            let page = guard.pin(&page_id)?;
            for k in 0..MAX_RECORDS {
                page.add_record(&[
                    Attribute::Int(k as i32),
                    Attribute::Str("Test".to_string()),
                    Attribute::Bool(k % 2 == 0),
                ]);
            }
            guard.unpin(&page_id)?;
            page_ids.push(page_id);
        }
    }

    // SELECT k, label WHERE k < 5
    let table = Table::new(pool.clone(), page_ids);
    let projection = Projection::new(
        Box::new(table),
        vec![(1, AttributeType::Int), (2, AttributeType::Str)],
    );
    let mut selection = Selection::new(
        Box::new(projection),
        1,
        AttributeType::Int,
        Attribute::Int(5),
        Comparator::Lt,
    )?;

    selection.open()?;
    while let Some(record) = selection.next()? {
        println!("{} {}", record.int_attribute(1), record.str_attribute(2));
    }
    selection.close()?;

    pool.lock().unwrap().flush_all()?;
    Ok(())
}
