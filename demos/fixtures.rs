use anyhow::Result;
use ndarray::arr2;
use tensordump::ArrayDumper;

// Writes fixtures/int_2_3.mp and fixtures/float_3_2.mp.
fn main() -> Result<()> {
    let dumper = ArrayDumper::builder()
        .dir("fixtures")
        .create_dirs(true)
        .build();
    let ints = dumper.dump("int_2_3.mp", arr2(&[[1i64, 2, 3], [4, 5, 6]]))?;
    let floats = dumper.dump("float_3_2.mp", arr2(&[[1.0f64, 2.0], [3.0, 4.0], [5.0, 6.0]]))?;
    println!("wrote {ints:?} and {floats:?}");
    Ok(())
}
