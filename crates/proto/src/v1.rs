use prost::Name;
use uninats::TypedMessage;

const PACKAGE: &str = "unidrop.uninats.v1";

/// A product was added to the catalogue.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ProductCreated {
    /// Product id.
    #[prost(string, tag = "1")]
    pub id: String,

    /// Display name.
    #[prost(string, tag = "2")]
    pub name: String,

    /// Id of the supplying party.
    #[prost(string, tag = "3")]
    pub supplier_id: String,

    /// Creation time in Unix milliseconds.
    #[prost(int64, tag = "4")]
    pub created_at: i64,
}

impl Name for ProductCreated {
    const NAME: &'static str = "ProductCreated";
    const PACKAGE: &'static str = PACKAGE;
}

impl TypedMessage for ProductCreated {}

/// Envelope published on the `sample.*` subjects.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Event {
    /// Event name, conventionally the subject it is published on.
    #[prost(string, tag = "1")]
    pub name: String,

    /// The product the event is about.
    #[prost(message, optional, tag = "2")]
    pub product: Option<ProductCreated>,
}

impl Name for Event {
    const NAME: &'static str = "Event";
    const PACKAGE: &'static str = PACKAGE;
}

impl TypedMessage for Event {
    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("event name is required".to_string());
        }

        if self.product.is_none() {
            return Err("event product is required".to_string());
        }

        Ok(())
    }
}

/// Request served on `example.say.hello`.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct SayHelloRequest {
    /// Who to greet.
    #[prost(string, tag = "1")]
    pub name: String,
}

impl Name for SayHelloRequest {
    const NAME: &'static str = "SayHelloRequest";
    const PACKAGE: &'static str = PACKAGE;
}

impl TypedMessage for SayHelloRequest {}

/// Response to [`SayHelloRequest`].
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct SayHelloResponse {
    /// The greeting.
    #[prost(string, tag = "1")]
    pub message: String,
}

impl Name for SayHelloResponse {
    const NAME: &'static str = "SayHelloResponse";
    const PACKAGE: &'static str = PACKAGE;
}

impl TypedMessage for SayHelloResponse {}
