//! Mail message API models

use chrono::NaiveDateTime;

use crate::schema::{ApiModel, ModelResult, Property, Record, Schema, SlashDateTime, Value, WireMap};

/// One MIME part of a captured message
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePart {
    pub id: i64,
    pub part_type: String,
    pub is_attachment: i64,
    pub file_name: String,
    pub charset: String,
    pub body: String,
    pub size: i64,
    pub created: NaiveDateTime,
}

impl ApiModel for MessagePart {
    const NAME: &'static str = "MessagePart";

    fn schema() -> ModelResult<Schema> {
        Schema::builder(Self::NAME)
            .property("id", Property::int().min(1))
            .property("part_type", Property::string().not_empty())
            .property("is_attachment", Property::int().one_of([0, 1]))
            .property("file_name", Property::string())
            .property("charset", Property::string())
            .property("body", Property::string())
            .property("size", Property::int().min(0))
            .property("created", Property::timestamp::<SlashDateTime>())
            .build()
    }

    fn from_record(mut record: Record) -> ModelResult<Self> {
        Ok(Self {
            id: record.take("id")?,
            part_type: record.take("part_type")?,
            is_attachment: record.take("is_attachment")?,
            file_name: record.take("file_name")?,
            charset: record.take("charset")?,
            body: record.take("body")?,
            size: record.take("size")?,
            created: record.take("created")?,
        })
    }

    fn to_record(&self) -> Record {
        Record::new(Self::NAME)
            .with("id", self.id)
            .with("part_type", self.part_type.as_str())
            .with("is_attachment", self.is_attachment)
            .with("file_name", self.file_name.as_str())
            .with("charset", self.charset.as_str())
            .with("body", self.body.as_str())
            .with("size", self.size)
            .with("created", self.created)
    }
}

/// A captured message with its parts.
///
/// `from` is a Rust keyword, so the field is `from_` and the wire key is
/// declared as `from`.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: i64,
    pub from_: String,
    pub preview: String,
    pub subject: String,
    pub date: NaiveDateTime,
    pub size: i64,
    pub recipients: WireMap,
    pub parts: Vec<MessagePart>,
}

impl ApiModel for Message {
    const NAME: &'static str = "Message";

    fn schema() -> ModelResult<Schema> {
        Schema::builder(Self::NAME)
            .property("id", Property::int().min(1))
            .property("from_", Property::string().named("from").not_empty())
            .property("preview", Property::string())
            .property("subject", Property::string())
            .property("date", Property::timestamp::<SlashDateTime>())
            .property("size", Property::int().min(0))
            .property("recipients", Property::map())
            .property("parts", Property::list_of(MessagePart::NAME))
            .build()
    }

    fn from_record(mut record: Record) -> ModelResult<Self> {
        let parts: Vec<Record> = record.take("parts")?;
        Ok(Self {
            id: record.take("id")?,
            from_: record.take("from_")?,
            preview: record.take("preview")?,
            subject: record.take("subject")?,
            date: record.take("date")?,
            size: record.take("size")?,
            recipients: record.take("recipients")?,
            parts: parts
                .into_iter()
                .map(MessagePart::from_record)
                .collect::<ModelResult<_>>()?,
        })
    }

    fn to_record(&self) -> Record {
        let parts: Vec<Value> = self
            .parts
            .iter()
            .map(|part| Value::Record(part.to_record()))
            .collect();
        Record::new(Self::NAME)
            .with("id", self.id)
            .with("from_", self.from_.as_str())
            .with("preview", self.preview.as_str())
            .with("subject", self.subject.as_str())
            .with("date", self.date)
            .with("size", self.size)
            .with("recipients", self.recipients.clone())
            .with("parts", Value::List(parts))
    }
}
