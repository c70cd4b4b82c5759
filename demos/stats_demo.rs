use clap::Parser;
use compact_collections::HashTable;
use compact_collections::hash::HASH_SEED;
use compact_collections::hash::sdbm_hash;
use compact_collections::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Fraction of the entries to erase after filling, to show tombstones.
    #[arg(short = 'e', long = "erase_fraction", default_value_t = 0.25)]
    erase_fraction: f64,
}

fn hash_u64(value: u64) -> u32 {
    sdbm_hash(&value.to_le_bytes(), HASH_SEED)
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table: HashTable<u64> = HashTable::with_capacity(args.target_capacity);

    println!(
        "Actual capacity: {} ({} slots)",
        table.capacity(),
        table.raw_capacity()
    );
    println!("Filling table with u64 values...");

    let num_values = table.capacity();
    for i in 0..num_values {
        let value = i as u64;
        match table.entry(hash_u64(value), |&v| v == value) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(_) => {
                panic!("Value already exists in table: {}", value);
            }
        }
    }

    println!("Inserted {} values into table", table.len());
    report(&table);

    let num_erased = (num_values as f64 * args.erase_fraction) as usize;
    for i in 0..num_erased {
        let value = i as u64;
        table.remove(hash_u64(value), |&v| v == value);
    }

    println!();
    println!("Erased {} values", num_erased);
    report(&table);

    table.check_shrink();
    println!();
    println!("After check_shrink: {} slots", table.raw_capacity());
}

fn report(table: &HashTable<u64>) {
    let stats = table.debug_stats();
    stats.print();

    println!("Chain length histogram:");
    for (len, count) in table.chain_histogram().iter().enumerate().skip(1) {
        if *count > 0 {
            println!("  {len:>3}: {count}");
        }
    }
}
