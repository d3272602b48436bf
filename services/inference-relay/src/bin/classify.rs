/// 画像分類推論Lambda関数
///
/// Step Functionsのタスクとして呼び出され、イベントの`image_data`（Base64画像）を
/// SageMakerエンドポイントで推論し、結果を`inferences`として追加して返却する。
/// Lambda関数としても、ローカルスクリプトとしても実行可能。
///
/// # 環境変数
/// - SAGEMAKER_ENDPOINT_NAME: 推論エンドポイント名
/// - SAGEMAKER_REGION: エンドポイントのリージョン
/// - INFERENCE_CONTENT_TYPE: 画像送信時のContent-Type（デフォルト: image/png）
/// - INFERENCE_OUTPUT_FORMAT: レスポンス形式 json / text（デフォルト: json）
///
/// # ローカル実行
/// ```bash
/// # 画像ファイルを推論
/// cargo run --bin classify -- --image ./bicycle_s_000513.png
///
/// # エンドポイントと追加フィールドを指定
/// cargo run --bin classify -- --image ./bicycle.png \
///     --endpoint-name image-classification-2024-01-01 \
///     --event '{"s3_key": "test/bicycle.png"}'
/// ```
use std::path::PathBuf;

use clap::Parser;
use inference_relay::application::InferenceRelay;
use inference_relay::domain::{IMAGE_DATA_KEY, ImagePayload, InferenceOutputFormat, ResponseEnvelope};
use inference_relay::infrastructure::{
    init_logging, EndpointConfig, InferenceClient, SageMakerInferenceClient,
};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info, info_span, Instrument};

/// コマンドライン引数（ローカル実行用）
///
/// 指定した値は環境変数より優先される。
#[derive(Parser, Debug)]
#[command(name = "classify")]
#[command(about = "画像ファイルをSageMakerエンドポイントで推論")]
struct CliArgs {
    /// 推論する画像ファイルのパス
    #[arg(long, short = 'i')]
    image: PathBuf,

    /// イベントに含める追加フィールド（JSONオブジェクト）
    #[arg(long, short = 'e')]
    event: Option<String>,

    /// 推論エンドポイント名
    #[arg(long)]
    endpoint_name: Option<String>,

    /// エンドポイントのリージョン
    #[arg(long)]
    region: Option<String>,

    /// 画像送信時のContent-Type
    #[arg(long)]
    content_type: Option<String>,

    /// レスポンス形式（json / text）
    #[arg(long)]
    output_format: Option<InferenceOutputFormat>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    if std::env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
        info!("Lambda関数として起動");
        run_lambda().await
    } else {
        info!("ローカルスクリプトとして起動");
        run_local(CliArgs::parse()).await
    }
}

/// Lambdaランタイムで実行
///
/// SageMakerクライアントはコールドスタート時に一度だけ作成し、各invocationで共有する。
async fn run_lambda() -> Result<(), Error> {
    let config = EndpointConfig::from_env().inspect_err(|err| {
        error!(error = %err, "エンドポイント設定読み込み失敗");
    })?;

    info!(
        endpoint_name = config.endpoint_name(),
        region = config.region(),
        content_type = config.content_type(),
        output_format = %config.output_format(),
        "エンドポイント設定を読み込み"
    );

    let client = SageMakerInferenceClient::from_config(&config).await;
    let relay = InferenceRelay::new(client, config);
    let relay = &relay;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handler(relay, event).await
    }))
    .await
}

/// Lambda関数のメインハンドラー
async fn handler<C: InferenceClient>(
    relay: &InferenceRelay<C>,
    event: LambdaEvent<Value>,
) -> Result<ResponseEnvelope, Error> {
    handle_payload(relay, event.payload, &event.context.request_id).await
}

/// イベントを処理する
///
/// 失敗時はエラーをそのままランタイムへ返し、invocation失敗として扱わせる
/// （Step Functions側ではタスク失敗になる）。
async fn handle_payload<C: InferenceClient>(
    relay: &InferenceRelay<C>,
    payload: Value,
    request_id: &str,
) -> Result<ResponseEnvelope, Error> {
    let span = info_span!("invocation", request_id = %request_id);

    async move {
        info!("推論イベントを受信");

        match relay.handle(payload).await {
            Ok(envelope) => {
                info!(status_code = envelope.status_code, "推論完了");
                Ok(envelope)
            }
            Err(err) => {
                error!(error_kind = err.kind(), error = %err, "推論リレー失敗");
                Err(err.into())
            }
        }
    }
    .instrument(span)
    .await
}

/// ローカル環境で実行
///
/// 画像ファイルを読み込んでBase64化し、Lambdaと同じ処理で推論して結果を標準出力に表示する。
async fn run_local(args: CliArgs) -> Result<(), Error> {
    let config = local_config(&args)?;

    let image = tokio::fs::read(&args.image).await.map_err(|err| {
        error!(path = %args.image.display(), error = %err, "画像ファイル読み込み失敗");
        err
    })?;

    info!(
        path = %args.image.display(),
        image_bytes = image.len(),
        endpoint_name = config.endpoint_name(),
        "画像ファイルを読み込み"
    );

    let payload = build_local_event(args.event.as_deref(), image)?;

    let client = SageMakerInferenceClient::from_config(&config).await;
    let relay = InferenceRelay::new(client, config);
    let envelope = handle_payload(&relay, payload, "local").await?;

    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// 環境変数の設定にコマンドライン引数を上書きする
fn local_config(args: &CliArgs) -> Result<EndpointConfig, Error> {
    let mut config = EndpointConfig::from_env()?;

    if let Some(endpoint_name) = &args.endpoint_name {
        config = config.with_endpoint_name(endpoint_name);
    }
    if let Some(region) = &args.region {
        config = config.with_region(region);
    }
    if let Some(content_type) = &args.content_type {
        config = config.with_content_type(content_type);
    }
    if let Some(output_format) = args.output_format {
        config = config.with_output_format(output_format);
    }

    Ok(config)
}

/// ローカル実行用のイベントを組み立てる
///
/// 追加フィールドのJSONに`image_data`を設定する（同名キーは画像で上書き）。
fn build_local_event(extra_fields: Option<&str>, image: Vec<u8>) -> Result<Value, Error> {
    let mut fields = match extra_fields {
        Some(json) => match serde_json::from_str::<Value>(json)? {
            Value::Object(fields) => fields,
            _ => return Err("--event はJSONオブジェクトである必要があります".into()),
        },
        None => serde_json::Map::new(),
    };

    let image_data = ImagePayload::from_bytes(image).encode();
    fields.insert(IMAGE_DATA_KEY.to_string(), Value::String(image_data));

    Ok(Value::Object(fields))
}
