//! wav-info.rs
//!
//! This program prints the format of a wave file and can copy its audio into
//! a fresh file, block by block.

extern crate wavio;
use wavio::{Error, FormatCode, WavFile};

#[macro_use]
extern crate clap;
use clap::{App, Arg};

const FRAMES_PER_BLOCK: usize = 4096;

fn print_info(path: &str, input: &WavFile) {
    let seconds = input.length() as f64 / input.sample_rate() as f64;
    println!("{}", path);
    println!("  format:      {:?}", input.format());
    println!("  channels:    {}", input.num_channels());
    println!("  sample rate: {}", input.sample_rate());
    println!(
        "  sample size: {} bytes ({} valid bits)",
        input.sample_size(),
        input.valid_bits_per_sample()
    );
    if input.format() == FormatCode::Extensible {
        println!("  channel mask: {:#010x}", input.channel_mask());
        println!("  sub-format:   {:#06x}", input.sub_format());
    }
    println!("  length:      {} frames ({:.3} s)", input.length(), seconds);
}

fn copy_file(input: &mut WavFile, output_path: &str) -> Result<u64, Error> {
    let mut output = WavFile::try_open(output_path, "w")?;
    output.set_format(input.format())?;
    output.set_num_channels(input.num_channels())?;
    output.set_sample_rate(input.sample_rate())?;
    output.set_sample_size(input.sample_size())?;
    if input.format() == FormatCode::Extensible {
        output.set_valid_bits_per_sample(input.valid_bits_per_sample())?;
        output.set_channel_mask(input.channel_mask())?;
        output.set_sub_format(input.sub_format())?;
    }

    let frame_size = input.spec().frame_size();
    let mut buffer = vec![0u8; FRAMES_PER_BLOCK * frame_size];
    let mut copied = 0u64;
    loop {
        let frames_read = input.read_raw(&mut buffer)?;
        if frames_read == 0 {
            break;
        }
        output.write_raw(&buffer[..frames_read * frame_size])?;
        copied += frames_read as u64;
    }

    output.close()?;
    Ok(copied)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("wav-info")
        .version(crate_version!())
        .author(crate_authors!())
        .about("Print the format of a wave file, optionally copying its audio.")
        .arg(
            Arg::with_name("copy")
                .long("copy")
                .short("c")
                .help("Copy the audio into a new wave file")
                .takes_value(true)
                .value_name("OUTPUT"),
        )
        .arg(
            Arg::with_name("INPUT")
                .help("Input wave file")
                .required(true),
        )
        .get_matches();

    let input_path = matches.value_of("INPUT").unwrap();
    let mut input = WavFile::try_open(input_path, "rb")?;
    print_info(input_path, &input);

    if let Some(output_path) = matches.value_of("copy") {
        let copied = copy_file(&mut input, output_path)?;
        println!("Copied {} frames to {}", copied, output_path);
    }

    input.close()?;
    Ok(())
}
