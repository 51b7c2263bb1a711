use clickhouse_native_codec::codec::decimal::{
    Decimal32Codec, Decimal64Codec, Decimal128Codec, Decimal256Codec,
};
use clickhouse_native_codec::codec::fixed::{
    BoolCodec, Date32Codec, DateCodec, DateTime64Codec, Ipv4Codec, Le,
};
use clickhouse_native_codec::codec::string::{FixedStringCodec, StringCodec};
use clickhouse_native_codec::codec::ValueDecoder;
use clickhouse_native_codec::schema::DecimalWidth;
use clickhouse_native_codec::{
    BlockReader, BlockWriter, ColumnType, Compression, Error, Result, decompress_block_into,
};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;

#[derive(Debug, Serialize)]
struct ColumnDump<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    type_name: &'a str,
    values: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct BlockDump<'a> {
    bytes: usize,
    columns: usize,
    rows: usize,
    data: Vec<ColumnDump<'a>>,
}

fn parse_arg(args: &[String], name: &str) -> Option<String> {
    for (i, a) in args.iter().enumerate() {
        if let Some(v) = a.strip_prefix(&(name.to_string() + "=")) {
            return Some(v.to_string());
        }
        if a == name {
            return args.get(i + 1).cloned();
        }
    }
    None
}

fn usage() -> &'static str {
    "\
native_inspect\n\
\n\
Prints one ClickHouse Native block as JSON.\n\
\n\
Args:\n\
  --input PATH          file holding one block, `-` for stdin\n\
  --sample              inspect a generated sample block instead\n\
  --compression NAME    none | zstd | gzip (default: none)\n\
  --max-uncompressed N  (default: 1073741824)\n\
  --max-rows N          values printed per column (default: all)\n\
  --pretty              indent the output\n"
}

fn sample_block() -> Result<Vec<u8>> {
    let rows = 4;
    let mut w = BlockWriter::new(4, rows);
    let mut id = w.create_uint64("id")?;
    for i in 0..rows as u64 {
        id.write(&i)?;
    }
    id.finish()?;
    let mut pair = w.create_low_cardinality_string("pair")?;
    for i in 0..rows {
        pair.write(if i % 2 == 0 { "BTCUSDT" } else { "ETHUSDT" })?;
    }
    pair.finish()?;
    let mut price = w.create_decimal128("price", 38, 8)?;
    for i in 0..rows {
        price.write(&format!("{}.12345678", 64_000 + i).parse()?)?;
    }
    price.finish()?;
    let mut note = w.create_nullable_string("note")?;
    for i in 0..rows {
        note.write((i % 3 == 0).then_some("fill"))?;
    }
    note.finish()?;
    w.finish()
}

fn values<'a, D, F>(
    r: &mut BlockReader<'a>,
    decoder: D,
    nullable: bool,
    max_rows: usize,
    render: F,
) -> Result<Vec<Value>>
where
    D: ValueDecoder<'a>,
    F: Fn(D::Item) -> Value,
{
    if nullable {
        r.next_nullable(decoder)?
            .take(max_rows)
            .map(|v| v.map(|v| v.map_or(Value::Null, &render)))
            .collect()
    } else {
        r.next_column(decoder)?
            .take(max_rows)
            .map(|v| v.map(&render))
            .collect()
    }
}

fn display<T: ToString>(v: T) -> Value {
    Value::String(v.to_string())
}

fn column_values(r: &mut BlockReader<'_>, ty: &ColumnType, max_rows: usize) -> Result<Vec<Value>> {
    let (inner, nullable) = match ty {
        ColumnType::Nullable(inner) => (inner.as_ref(), true),
        ColumnType::LowCardinality(inner) if **inner == ColumnType::String => {
            return r
                .read_low_cardinality_string()?
                .take(max_rows)
                .map(|v| v.map(Value::from))
                .collect();
        }
        ColumnType::LowCardinality(_) => {
            return Err(Error::Unsupported(format!("column type {ty}")));
        }
        other => (other, false),
    };
    match inner {
        ColumnType::UInt8 => values(r, Le::<u8>::new(), nullable, max_rows, Value::from),
        ColumnType::UInt16 => values(r, Le::<u16>::new(), nullable, max_rows, Value::from),
        ColumnType::UInt32 => values(r, Le::<u32>::new(), nullable, max_rows, Value::from),
        ColumnType::UInt64 => values(r, Le::<u64>::new(), nullable, max_rows, Value::from),
        ColumnType::UInt128 => values(r, Le::<u128>::new(), nullable, max_rows, display),
        ColumnType::Int8 => values(r, Le::<i8>::new(), nullable, max_rows, Value::from),
        ColumnType::Int16 => values(r, Le::<i16>::new(), nullable, max_rows, Value::from),
        ColumnType::Int32 => values(r, Le::<i32>::new(), nullable, max_rows, Value::from),
        ColumnType::Int64 => values(r, Le::<i64>::new(), nullable, max_rows, Value::from),
        ColumnType::Int128 => values(r, Le::<i128>::new(), nullable, max_rows, display),
        ColumnType::Float32 => values(r, Le::<f32>::new(), nullable, max_rows, Value::from),
        ColumnType::Float64 => values(r, Le::<f64>::new(), nullable, max_rows, Value::from),
        ColumnType::Bool => values(r, BoolCodec, nullable, max_rows, Value::from),
        ColumnType::Date => values(r, DateCodec, nullable, max_rows, display),
        ColumnType::Date32 => values(r, Date32Codec, nullable, max_rows, display),
        ColumnType::IPv4 => values(r, Ipv4Codec, nullable, max_rows, display),
        ColumnType::String => values(r, StringCodec, nullable, max_rows, Value::from),
        ColumnType::FixedString(n) => {
            values(r, FixedStringCodec::new(*n)?, nullable, max_rows, Value::from)
        }
        ColumnType::DateTime64 { scale, timezone } => {
            let codec = DateTime64Codec::new(*scale, timezone.as_deref())?;
            let local = codec.clone();
            values(r, codec, nullable, max_rows, move |v| {
                display(local.to_local(&v).to_rfc3339())
            })
        }
        ColumnType::Decimal { precision, scale } => {
            let (p, s) = (*precision, *scale);
            match DecimalWidth::for_precision(p)? {
                DecimalWidth::D32 => {
                    values(r, Decimal32Codec::new(p, s)?, nullable, max_rows, display)
                }
                DecimalWidth::D64 => {
                    values(r, Decimal64Codec::new(p, s)?, nullable, max_rows, display)
                }
                DecimalWidth::D128 => {
                    values(r, Decimal128Codec::new(p, s)?, nullable, max_rows, display)
                }
                DecimalWidth::D256 => {
                    values(r, Decimal256Codec::new(p, s)?, nullable, max_rows, display)
                }
            }
        }
        ColumnType::Nullable(_) | ColumnType::LowCardinality(_) => {
            Err(Error::Unsupported(format!("column type {ty}")))
        }
    }
}

fn inspect(bytes: &[u8], max_rows: usize) -> Result<BlockDump<'_>> {
    let mut r = BlockReader::new(bytes)?;
    let mut dump = BlockDump {
        bytes: bytes.len(),
        columns: r.columns(),
        rows: r.rows(),
        data: Vec::with_capacity(r.columns().min(1024)),
    };
    while !r.is_finished() {
        let header = r.peek_column()?;
        let ty = header.column_type()?;
        let values = column_values(&mut r, &ty, max_rows)?;
        dump.data.push(ColumnDump {
            name: header.name,
            type_name: header.type_name,
            values,
        });
    }
    Ok(dump)
}

fn read_input(path: &str) -> std::io::Result<Vec<u8>> {
    if path == "-" {
        let mut out = Vec::new();
        std::io::stdin().read_to_end(&mut out)?;
        return Ok(out);
    }
    std::fs::read(path)
}

fn run(args: &[String]) -> Result<String> {
    let max_uncompressed_len: usize = parse_arg(args, "--max-uncompressed")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1024 * 1024 * 1024);
    let max_rows: usize = parse_arg(args, "--max-rows")
        .and_then(|v| v.parse().ok())
        .unwrap_or(usize::MAX);
    let compression = match parse_arg(args, "--compression").as_deref().unwrap_or("none") {
        "none" => Compression::None,
        "zstd" => Compression::Zstd { level: 3 },
        "gzip" => Compression::Gzip { level: 6 },
        other => return Err(Error::Other(format!("unknown compression `{other}`"))),
    };

    let raw = if args.iter().any(|a| a == "--sample") {
        sample_block()?
    } else {
        let path = parse_arg(args, "--input")
            .ok_or_else(|| Error::Other("missing --input (see --help)".to_string()))?;
        read_input(&path).map_err(|e| Error::Other(format!("{path}: {e}")))?
    };
    let mut block = Vec::new();
    decompress_block_into(&raw, compression, max_uncompressed_len, &mut block)?;

    let dump = inspect(&block, max_rows)?;
    let json = if args.iter().any(|a| a == "--pretty") {
        serde_json::to_string_pretty(&dump)
    } else {
        serde_json::to_string(&dump)
    };
    json.map_err(|e| Error::Other(e.to_string()))
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        eprint!("{}", usage());
        std::process::exit(0);
    }
    match run(&args) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("native_inspect: {e}");
            std::process::exit(1);
        }
    }
}
