use oxyrel::render::{DEFAULT_WIDTH, render_result, render_snapshot};
use oxyrel::{Database, Value};

fn main() -> oxyrel::Result<()> {
    println!("In-Memory Relational Store Demo\n");

    // Create DB
    let mut db = Database::new();

    // Two tables and a foreign key between them
    db.execute(
        "create person ( id int primary key ( id ) name string age int ) \
         create orders ( oid int primary key ( oid ) pid int total float ) \
         alter table orders foreign key ( pid ) references person ( id )",
    )?;
    println!("Created tables: {}", db.list_tables().join(", "));

    // Insert data
    println!("Inserting data...");
    db.execute(
        "insert into person ( id name age ) values ( 1 'Alice' 30 ) \
         insert into person ( id name age ) values ( 2 'Bob' 41 ) \
         insert into person ( id name age ) values ( 3 'Charlie' 25 ) \
         insert into orders ( oid pid total ) values ( 10 1 19.5 ) \
         insert into orders ( oid pid total ) values ( 11 3 7.25 )",
    )?;

    // Rejected writes leave the store untouched
    for statement in [
        "insert into person ( id name age ) values ( 1 'Dup' 50 )",
        "insert into orders ( oid pid total ) values ( 12 9 1.0 )",
        "alter table person drop id",
    ] {
        if let Err(err) = db.execute(statement) {
            println!("rejected: {err}");
        }
    }
    println!();

    println!("People over 28:");
    let result = db.query("select name age from person where age > 28")?;
    print!("{}", render_result(&result, 10));
    println!();

    db.execute("update person set age = 31 where name = 'Alice'")?;
    let result = db.query("select * from person where id = 1")?;
    if let Some(Value::Int(age)) = result.rows.first().and_then(|row| row.get(2)) {
        println!("Alice is now {age}\n");
    }

    print!("{}", render_snapshot(&db, DEFAULT_WIDTH));
    println!("\ncatalog footprint: {} bytes", db.allocated_bytes());

    Ok(())
}
