//! Common test fixtures for generation states, workflow documents and checkers.
use async_trait::async_trait;
use genflow::prelude::*;
use serde_json::{Value, json};

#[allow(dead_code)]
pub fn sd_model() -> ModelIdentifier {
    ModelIdentifier::new("sd15-key", "Stable Diffusion 1.5", BaseModel::StableDiffusion1, "main")
}

#[allow(dead_code)]
pub fn sdxl_model() -> ModelIdentifier {
    ModelIdentifier::new("sdxl-key", "SDXL Base", BaseModel::StableDiffusionXl, "main")
}

#[allow(dead_code)]
pub fn vae_model() -> ModelIdentifier {
    ModelIdentifier::new("vae-key", "sd-vae-ft-mse", BaseModel::StableDiffusion1, "vae")
}

#[allow(dead_code)]
pub fn lora_model(key: &str) -> ModelIdentifier {
    ModelIdentifier::new(key, key, BaseModel::StableDiffusion1, "lora")
}

/// A text-to-image state with the given main model and a simple prompt.
#[allow(dead_code)]
pub fn state_with_model(model: ModelIdentifier) -> GenerationState {
    GenerationState {
        positive_prompt: "a lighthouse at dusk".to_string(),
        negative_prompt: "blurry".to_string(),
        seed: 1234,
        model: Some(model),
        ..Default::default()
    }
}

/// A current-version workflow: an image primitive feeding an image resize node.
///
/// The primitive references `image_name`.
#[allow(dead_code)]
pub fn current_workflow(image_name: &str) -> Value {
    json!({
        "name": "Resize an image",
        "author": "tests",
        "description": "",
        "version": "1.0",
        "contact": "",
        "tags": "resize",
        "notes": "",
        "exposedFields": [{ "nodeId": "resize", "fieldName": "width" }],
        "meta": { "version": "3.0.0", "category": "user" },
        "nodes": [
            {
                "id": "img",
                "type": "invocation",
                "position": { "x": 0.0, "y": 0.0 },
                "data": {
                    "id": "img",
                    "type": "image",
                    "version": "1.0.1",
                    "label": "",
                    "notes": "",
                    "isOpen": true,
                    "isIntermediate": true,
                    "useCache": true,
                    "nodePack": "invokeai",
                    "inputs": {
                        "image": { "name": "image", "label": "", "value": { "image_name": image_name } }
                    }
                }
            },
            {
                "id": "resize",
                "type": "invocation",
                "position": { "x": 400.0, "y": 0.0 },
                "data": {
                    "id": "resize",
                    "type": "img_resize",
                    "version": "1.2.2",
                    "label": "",
                    "notes": "",
                    "isOpen": true,
                    "isIntermediate": false,
                    "useCache": true,
                    "nodePack": "invokeai",
                    "inputs": {
                        "image": { "name": "image", "label": "", "value": null },
                        "width": { "name": "width", "label": "", "value": 1024 },
                        "height": { "name": "height", "label": "", "value": 1024 }
                    }
                }
            }
        ],
        "edges": [
            {
                "id": "reactflow__edge-imgimage-resizeimage",
                "type": "default",
                "source": "img",
                "target": "resize",
                "sourceHandle": "image",
                "targetHandle": "image"
            }
        ]
    })
}

/// The same pipeline as `current_workflow`, in the 1.0.0 schema with a notes node.
#[allow(dead_code)]
pub fn v1_workflow() -> Value {
    json!({
        "name": "Legacy resize",
        "author": "",
        "description": "",
        "version": "",
        "contact": "",
        "tags": "",
        "notes": "",
        "exposedFields": [],
        "meta": { "version": "1.0.0" },
        "nodes": [
            {
                "id": "img",
                "type": "invocation",
                "position": { "x": 0, "y": 0 },
                "data": {
                    "id": "img",
                    "type": "image",
                    "label": "",
                    "notes": "",
                    "isOpen": true,
                    "isIntermediate": true,
                    "inputs": {
                        "image": {
                            "id": "4f6c",
                            "name": "image",
                            "type": "ImageField",
                            "fieldKind": "input",
                            "label": "",
                            "value": { "image_name": "cat.png" }
                        }
                    },
                    "outputs": {
                        "image": { "id": "9a1e", "name": "image", "type": "ImageField", "fieldKind": "output" },
                        "width": { "id": "9a1f", "name": "width", "type": "integer", "fieldKind": "output" },
                        "height": { "id": "9a20", "name": "height", "type": "integer", "fieldKind": "output" }
                    }
                }
            },
            {
                "id": "resize",
                "type": "invocation",
                "position": { "x": 400, "y": 0 },
                "data": {
                    "id": "resize",
                    "type": "img_resize",
                    "version": "1.0.0",
                    "label": "",
                    "notes": "",
                    "isOpen": true,
                    "isIntermediate": false,
                    "inputs": {
                        "image": { "id": "b1", "name": "image", "type": "ImageField", "fieldKind": "input", "label": "" },
                        "width": { "id": "b2", "name": "width", "type": "integer", "fieldKind": "input", "label": "", "value": 768 },
                        "height": { "id": "b3", "name": "height", "type": "integer", "fieldKind": "input", "label": "", "value": 768 }
                    },
                    "outputs": {
                        "image": { "id": "b4", "name": "image", "type": "ImageField", "fieldKind": "output" }
                    }
                }
            },
            {
                "id": "note",
                "type": "notes",
                "position": { "x": 0, "y": 400 },
                "data": { "id": "note", "label": "Read me", "notes": "Upscales the input", "isOpen": true }
            }
        ],
        "edges": [
            {
                "id": "e1",
                "type": "default",
                "source": "img",
                "target": "resize",
                "sourceHandle": "image",
                "targetHandle": "image"
            }
        ]
    })
}

/// Denies access to the listed images. Everything else is accessible.
#[allow(dead_code)]
pub struct DenyImages(pub Vec<&'static str>);

#[async_trait]
impl ResourceChecker for DenyImages {
    async fn check_image_access(&self, image_name: &str) -> std::result::Result<bool, CheckError> {
        Ok(!self.0.contains(&image_name))
    }

    async fn check_board_access(&self, _board_id: &str) -> std::result::Result<bool, CheckError> {
        Ok(true)
    }

    async fn check_model_access(&self, _model_key: &str) -> std::result::Result<bool, CheckError> {
        Ok(true)
    }
}

/// Fails every check, as if the backend were unreachable.
#[allow(dead_code)]
pub struct Unreachable;

#[async_trait]
impl ResourceChecker for Unreachable {
    async fn check_image_access(&self, _image_name: &str) -> std::result::Result<bool, CheckError> {
        Err(CheckError::new("connection refused"))
    }

    async fn check_board_access(&self, _board_id: &str) -> std::result::Result<bool, CheckError> {
        Err(CheckError::new("connection refused"))
    }

    async fn check_model_access(&self, _model_key: &str) -> std::result::Result<bool, CheckError> {
        Err(CheckError::new("connection refused"))
    }
}

/// Image checks error out; boards and models are reported missing.
#[allow(dead_code)]
pub struct PartialOutage;

#[async_trait]
impl ResourceChecker for PartialOutage {
    async fn check_image_access(&self, _image_name: &str) -> std::result::Result<bool, CheckError> {
        Err(CheckError::new("image service timed out"))
    }

    async fn check_board_access(&self, _board_id: &str) -> std::result::Result<bool, CheckError> {
        Ok(false)
    }

    async fn check_model_access(&self, _model_key: &str) -> std::result::Result<bool, CheckError> {
        Ok(false)
    }
}
