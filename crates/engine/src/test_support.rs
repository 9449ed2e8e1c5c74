use std::path::{Path, PathBuf};

use da_types::{ClientCredentials, WorkflowConfig};
use serde_json::json;
use wiremock::MockServer;

use crate::context::{WorkflowContext, WorkflowOptions};

pub(crate) fn sample_config(automation_base_url: &str, storage_base_url: &str, input_path: &str) -> WorkflowConfig {
    serde_json::from_value(json!({
        "AppId": "ChangeParamApp",
        "EngineName": "Autodesk.Inventor+2024",
        "LocalAppPackage": "bundle.zip",
        "InputPath": input_path,
        "InputPartFile": "box.ipt",
        "OutputPartSmallFile": "smallBox.ipt",
        "OutputPartLargeFile": "largeBox.ipt",
        "OutputPartSmallThumb": "smallThumb.bmp",
        "OutputPartLargeThumb": "largeThumb.bmp",
        "OutputImageSmallFile": "smallImage.png",
        "OutputImageLargeFile": "largeImage.png",
        "OutputZipAssemblyFile": "assembly.zip",
        "PartAssemblyActivityId": "PartAssemblyActivity",
        "AutomationBaseUrl": automation_base_url,
        "StorageBaseUrl": storage_base_url,
        "ReqInputArgName": "InventorDoc",
        "OutputPartSmallArgName": "OutputSmall",
        "OutputPartLargeArgName": "OutputLarge",
        "OutputPartSmallThumbArgName": "OutputSmallThumb",
        "OutputPartLargeThumbArgName": "OutputLargeThumb",
        "OutputAssemblyArgName": "OutputAssembly",
        "OutputImageSmallArgName": "OutputImageSmall",
        "OutputImageLargeArgName": "OutputImageLarge",
        "ErrorReport": "error.txt",
        "PartReport": "partReport.txt",
        "AssemblyReport": "assemblyReport.txt",
        "ParamFileSmall": "paramsSmall.json",
        "ParamFileLarge": "paramsLarge.json",
        "ParamArgNameSmall": "InventorParamsSmall",
        "ParamArgNameLarge": "InventorParamsLarge",
        "LightFile": "light.png",
        "HeavyFile": "heavy.png"
    }))
    .expect("sample configuration")
}

/// A context whose services both live on `server` (`/da/v3/` and `/oss/v2/`)
/// and whose inputs and downloads live under `workspace`.
pub(crate) fn mock_context(server: &MockServer, workspace: &Path) -> WorkflowContext {
    let mut config = sample_config(
        &format!("{}/da/v3/", server.uri()),
        &format!("{}/oss/v2/", server.uri()),
        &workspace.join("inputs").to_string_lossy(),
    );
    config.local_app_package = workspace.join("bundle.zip");
    let options = WorkflowOptions {
        output_dir: Some(workspace.join("downloads")),
        poll_interval: std::time::Duration::from_millis(1),
        ..WorkflowOptions::default()
    };
    let mut ctx = WorkflowContext::new(config, ClientCredentials::new("AbC", "secret"), options).expect("context");
    ctx.set_nickname("acme");
    ctx
}

pub(crate) fn downloads(workspace: &Path) -> PathBuf {
    workspace.join("downloads")
}
