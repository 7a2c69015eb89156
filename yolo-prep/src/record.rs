//! Training records and tensor serialization.

use crate::common::*;
use std::fs::File;
use tfrecord::{
    protobuf::{feature::Kind, BytesList, Example, Feature, Features},
    RecordWriter,
};

pub use codec::*;
pub use example::*;

mod example {
    use super::*;

    /// A training sample holding the serialized image and label tensors.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct TrainingExample {
        pub image: Vec<u8>,
        pub label: Vec<u8>,
    }

    impl TrainingExample {
        pub const IMAGE_KEY: &'static str = "image";
        pub const LABEL_KEY: &'static str = "label";

        /// Converts into a protobuf example with two bytes features.
        pub fn to_example(&self) -> Example {
            let feature = [
                (Self::IMAGE_KEY, &self.image),
                (Self::LABEL_KEY, &self.label),
            ]
            .into_iter()
            .map(|(key, bytes)| {
                let feature = Feature {
                    kind: Some(Kind::BytesList(BytesList {
                        value: vec![bytes.clone()],
                    })),
                };
                (key.to_string(), feature)
            })
            .collect();

            Example {
                features: Some(Features { feature }),
            }
        }

        /// Extracts the image and label bytes from a protobuf example.
        pub fn from_example(example: &Example) -> Result<Self> {
            let features = &example
                .features
                .as_ref()
                .ok_or_else(|| format_err!("example has no features"))?
                .feature;
            let bytes_of = |key: &str| -> Result<Vec<u8>> {
                match features.get(key).and_then(|feature| feature.kind.as_ref()) {
                    Some(Kind::BytesList(BytesList { value })) if value.len() == 1 => {
                        Ok(value[0].clone())
                    }
                    _ => bail!("feature '{}' is not a single bytes value", key),
                }
            };

            Ok(Self {
                image: bytes_of(Self::IMAGE_KEY)?,
                label: bytes_of(Self::LABEL_KEY)?,
            })
        }
    }

    /// Writes training examples to a TFRecord file.
    pub struct ExampleSink {
        path: PathBuf,
        writer: RecordWriter<Example, BufWriter<File>>,
        count: usize,
    }

    impl ExampleSink {
        pub fn create(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            if let Some(dir) = path.parent() {
                if !dir.as_os_str().is_empty() {
                    fs::create_dir_all(dir)?;
                }
            }
            let writer = RecordWriter::<Example, _>::create(path)
                .with_context(|| format!("failed to create record file '{}'", path.display()))?;

            Ok(Self {
                path: path.to_owned(),
                writer,
                count: 0,
            })
        }

        pub fn send(&mut self, example: &TrainingExample) -> Result<()> {
            self.writer.send(example.to_example())?;
            self.count += 1;
            Ok(())
        }

        /// Flushes the file and returns the number of written examples.
        pub fn finish(mut self) -> Result<usize> {
            self.writer.flush()?;
            info!(
                "wrote {} examples to '{}'",
                self.count,
                self.path.display()
            );
            Ok(self.count)
        }
    }
}

mod codec {
    use super::*;

    /// Serializes tensors into byte strings and back.
    pub trait TensorCodec {
        fn encode_u8(&self, tensor: &ArrayViewD<u8>) -> Result<Vec<u8>>;
        fn encode_f32(&self, tensor: &ArrayViewD<f32>) -> Result<Vec<u8>>;
        fn decode_u8(&self, bytes: &[u8]) -> Result<ArrayD<u8>>;
        fn decode_f32(&self, bytes: &[u8]) -> Result<ArrayD<f32>>;
    }

    const MAGIC: &[u8; 4] = b"YTNS";

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(u8)]
    enum DType {
        U8 = 0,
        F32 = 1,
    }

    /// Little-endian layout: magic `YTNS`, dtype byte, rank as u32, each
    /// dimension as u64, then the elements in row-major order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RawTensorCodec;

    impl RawTensorCodec {
        fn write_header(buf: &mut Vec<u8>, dtype: DType, shape: &[usize]) -> io::Result<()> {
            buf.write_all(MAGIC)?;
            buf.write_u8(dtype as u8)?;
            buf.write_u32::<LittleEndian>(shape.len() as u32)?;
            shape
                .iter()
                .try_for_each(|&dim| buf.write_u64::<LittleEndian>(dim as u64))?;
            Ok(())
        }

        fn read_header(reader: &mut impl Read, expect: DType) -> Result<Vec<usize>> {
            let mut magic = [0u8; 4];
            reader.read_exact(&mut magic).context("truncated tensor header")?;
            ensure!(&magic == MAGIC, "invalid tensor magic {:?}", magic);

            let dtype = reader.read_u8()?;
            ensure!(
                dtype == expect as u8,
                "expect dtype {:?}, but get code {}",
                expect,
                dtype
            );

            let rank = reader.read_u32::<LittleEndian>()?;
            let shape: Vec<usize> = (0..rank)
                .map(|_| -> Result<_> { Ok(reader.read_u64::<LittleEndian>()? as usize) })
                .try_collect()?;
            Ok(shape)
        }

        fn num_elements(shape: &[usize]) -> Result<usize> {
            shape
                .iter()
                .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
                .ok_or_else(|| format_err!("tensor shape {:?} is too large", shape))
        }
    }

    impl TensorCodec for RawTensorCodec {
        fn encode_u8(&self, tensor: &ArrayViewD<u8>) -> Result<Vec<u8>> {
            let mut buf = vec![];
            Self::write_header(&mut buf, DType::U8, tensor.shape())?;
            buf.extend(tensor.iter());
            Ok(buf)
        }

        fn encode_f32(&self, tensor: &ArrayViewD<f32>) -> Result<Vec<u8>> {
            let mut buf = vec![];
            Self::write_header(&mut buf, DType::F32, tensor.shape())?;
            tensor
                .iter()
                .try_for_each(|&value| buf.write_f32::<LittleEndian>(value))?;
            Ok(buf)
        }

        fn decode_u8(&self, bytes: &[u8]) -> Result<ArrayD<u8>> {
            let mut reader = bytes;
            let shape = Self::read_header(&mut reader, DType::U8)?;
            let len = Self::num_elements(&shape)?;
            ensure!(
                reader.len() == len,
                "expect {} bytes of data, but get {}",
                len,
                reader.len()
            );
            let tensor = ArrayD::from_shape_vec(IxDyn(&shape), reader.to_vec())?;
            Ok(tensor)
        }

        fn decode_f32(&self, bytes: &[u8]) -> Result<ArrayD<f32>> {
            let mut reader = bytes;
            let shape = Self::read_header(&mut reader, DType::F32)?;
            let len = Self::num_elements(&shape)?;
            ensure!(
                Some(reader.len()) == len.checked_mul(4),
                "expect {} f32 values, but get {} bytes",
                len,
                reader.len()
            );
            let mut values = vec![0f32; len];
            reader.read_f32_into::<LittleEndian>(&mut values)?;
            let tensor = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
            Ok(tensor)
        }
    }
}
